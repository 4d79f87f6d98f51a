/*!
# PVD Coating Records Search

A small lookup tool over the PVD process workbook, served to the browser and to a
terminal front end.

## Overview

The workbook holds two sheets. The `raw` sheet lists one manufacturing record per
material number; the grade reference sheet lists coating grades with their film,
alloy and process attributes. Operators look things up from two views:

- **Material number view**: free-text search over the records, grouped by coating
  group and sorted by material number.
- **Grade view**: alloy and grade dropdowns (the grade list follows the chosen
  alloy) plus free text, grouped by film name.

Selecting a row shows every attribute of that row in a detail panel.

## Architecture

### Data Layer
- Workbook or CSV pair parsed once into immutable string tables
- Gzip-compressed bincode snapshot reused while newer than the sources
- Load-once store shared by every request

### Query Pipeline
- Filter: dropdown equality constraints, then case-insensitive AND keywords
- Sort: stable multi-key ordering
- Group: consecutive equal values become one group header
- Project: list columns, width hints and pagination
- Detail: first row of the full table matching the selected key

### Front Ends
- **website**: axum server with a login gate, JSON API and CSV/XLSX export
- **pvd-cli**: line-oriented terminal client over the same pipeline

## Modules

- **error**: Error type shared by every module
- **table**: Tables, rows and row subsets
- **loader**: Workbook and CSV parsing
- **saving**: Snapshot cache of parsed tables
- **store**: Load-once table store
- **filter**, **sort**, **projection**, **detail**: Pipeline stages
- **views**: The two views and their configuration
- **login**: Login gate and per-session state
- **downloader**: CSV and XLSX export
- **config**: YAML configuration and command-line flags
- **app**: Routing and handlers (feature `web`)

## REST API Endpoints

- `/api/session` - Gate state, page size and current selection
- `/api/options?alloy=` - Alloy and grade dropdown contents
- `/api/{view}/search?q=&alloy=&grade=&page=` - One page of results
- `/api/{view}/detail/{key}` - Every attribute of the selected row
- `/api/{view}/export?format=csv|xlsx` - The whole filtered result
*/

pub mod config;
pub mod detail;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod loader;
pub mod login;
pub mod projection;
pub mod saving;
pub mod sort;
pub mod store;
pub mod table;
pub mod views;

#[cfg(feature = "web")]
pub mod app;

pub use error::{Result, SearchError};
