#![cfg(not(tarpaulin_include))]

use clap::Parser;
use pvd_search::config::{AppConfig, CliArgs};
use pvd_search::downloader;
use pvd_search::filter::ANY;
use pvd_search::login::{AccessGate, SessionState, UserCredentials};
use pvd_search::projection::WidthPolicy;
use pvd_search::views::{self, ResultPage, SearchQuery, ViewKind, grades};
use pvd_search::{SearchError, table::Tables};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

/// What the terminal session is currently looking at.
struct Screen {
    view: ViewKind,
    text: String,
    alloy: String,
    grade: String,
    page: usize,
}

impl Screen {
    fn query(&self) -> SearchQuery {
        let spec = self.view.spec();
        SearchQuery {
            text: self.text.clone(),
            constraints: spec.constraints_from(|param| match param {
                "alloy" => Some(self.alloy.as_str()),
                "grade" => Some(self.grade.as_str()),
                _ => None,
            }),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let s = Instant::now();
    let args = CliArgs::parse();
    let config = AppConfig::from_args(&args)?;

    let tables = config.table_store().load()?;
    views::validate_views(&tables)?;
    println!(
        "{} records, {} grade rows loaded in {:.2}s",
        tables.records.len(),
        tables.grades.len(),
        s.elapsed().as_secs_f64()
    );

    let gate = AccessGate::new(&config.auth);
    let mut session = SessionState::default();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    if !log_in(&gate, &mut session, &mut lines)? {
        return Ok(());
    }

    let mut screen = Screen {
        view: ViewKind::Materials,
        text: String::new(),
        alloy: ANY.to_string(),
        grade: ANY.to_string(),
        page: 1,
    };
    let mut status = String::from("ok");
    let mut show = true;
    let mut start_time = Instant::now();

    loop {
        if show {
            let spec = screen.view.spec();
            let query = screen.query();
            match spec.page(
                spec.table(&tables),
                &query,
                screen.page,
                config.page_size,
                &config.width,
            ) {
                Ok(page) => {
                    screen.page = page.page;
                    display(&page, &config.width, session.selected_key(page.view));
                }
                Err(e) => status = e.to_string(),
            }
        }

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let command = line.trim();
        start_time = Instant::now();
        show = true;

        let (verb, rest) = match command.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (command, ""),
        };

        status = String::from("ok");
        match verb {
            "" => show = false,
            "q" => break,
            "help" => {
                print_help();
                show = false;
            }
            "m" => {
                screen.view = ViewKind::Materials;
                screen.text = rest.to_string();
                screen.page = 1;
            }
            "g" => {
                screen.view = ViewKind::Grades;
                screen.text = rest.to_string();
                screen.page = 1;
            }
            "alloy" => {
                screen.view = ViewKind::Grades;
                screen.alloy = pick(rest);
                screen.grade = ANY.to_string();
                screen.page = 1;
            }
            "grade" => {
                screen.view = ViewKind::Grades;
                screen.grade = pick(rest);
                screen.page = 1;
            }
            "options" => {
                match views::grade_options(&tables.grades, &screen.alloy) {
                    Ok(options) => {
                        println!("{}: {}", grades::ALLOY, options.alloys.join(", "));
                        println!("{}: {}", grades::GRADE, options.grades.join(", "));
                    }
                    Err(e) => status = e.to_string(),
                }
                show = false;
            }
            "n" => screen.page += 1,
            "p" => screen.page = screen.page.saturating_sub(1).max(1),
            "d" => {
                let (message, found) = show_detail(&tables, screen.view, rest);
                session.record_detail(screen.view, rest, found);
                status = message;
                show = false;
            }
            "export" => {
                status = match export(&tables, &screen, rest) {
                    Ok(()) => format!("wrote {}", rest),
                    Err(e) => e.to_string(),
                };
                show = false;
            }
            "logout" => {
                gate.logout(&mut session);
                if !log_in(&gate, &mut session, &mut lines)? {
                    break;
                }
            }
            _ => {
                status = String::from("invalid command");
                show = false;
            }
        }
    }

    Ok(())
}

/// Prompt until the gate opens; `false` when input ends first.
fn log_in(
    gate: &AccessGate,
    session: &mut SessionState,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> io::Result<bool> {
    while !gate.permits(session) {
        print!("ID: ");
        io::stdout().flush()?;
        let Some(username) = lines.next().transpose()? else {
            return Ok(false);
        };
        print!("Password: ");
        io::stdout().flush()?;
        let Some(password) = lines.next().transpose()? else {
            return Ok(false);
        };

        let credentials = UserCredentials {
            username: username.trim().to_string(),
            password: password.trim_end_matches(['\r', '\n']).to_string(),
        };
        if let Err(e) = gate.submit(session, &credentials) {
            println!("{}", e);
        }
    }
    Ok(true)
}

fn pick(value: &str) -> String {
    if value.is_empty() {
        ANY.to_string()
    } else {
        value.to_string()
    }
}

fn print_help() {
    println!("Commands:");
    println!("  m <text>: Search material numbers");
    println!("  g <text>: Search grades");
    println!("  alloy <name>: Pick an alloy (empty or {} for all)", ANY);
    println!("  grade <name>: Pick a grade (empty or {} for all)", ANY);
    println!("  options: List alloy and grade choices");
    println!("  n / p: Next / previous page");
    println!("  d <key>: Show every attribute of a row");
    println!("  export <file.csv|file.xlsx>: Write the whole result");
    println!("  logout: Log out");
    println!("  q: Quit");
}

/// Print one result page; the selected row is marked with `>`.
fn display(page: &ResultPage, widths: &WidthPolicy, selected: Option<&str>) {
    let spec = page.view.spec();
    println!();
    println!(
        "{}  ({} rows, page {}/{})",
        spec.title, page.total, page.page, page.page_count
    );

    let chars: Vec<usize> = page
        .columns
        .iter()
        .map(|hint| (hint.width.saturating_sub(widths.margin) / widths.px_per_char.max(1)) as usize)
        .collect();

    let header: Vec<String> = page
        .columns
        .iter()
        .zip(&chars)
        .map(|(hint, &w)| format!("{:<w$}", hint.name, w = w))
        .collect();
    println!("  {}", header.join(" | "));

    for (i, row) in page.rows.iter().enumerate() {
        if let Some(group) = page.groups.iter().find(|g| g.start == i) {
            println!("[{}]", if group.key.is_empty() { "-" } else { group.key.as_str() });
        }
        let cells: Vec<String> = row
            .iter()
            .zip(&chars)
            .map(|(value, &w)| format!("{:<w$}", value, w = w))
            .collect();
        let marker = match selected {
            Some(key) if page.keys.get(i).is_some_and(|k| k == key) => '>',
            _ => ' ',
        };
        println!("{} {}", marker, cells.join(" | "));
    }
    if page.total == 0 {
        println!("  (no results)");
    }
}

/// Print the detail fields of `key`; the flag says whether a row was found.
fn show_detail(tables: &Tables, view: ViewKind, key: &str) -> (String, bool) {
    let spec = view.spec();
    match spec.detail(spec.table(tables), key) {
        Ok(detail) => {
            let width = detail
                .fields
                .iter()
                .map(|f| f.name.chars().count())
                .max()
                .unwrap_or(0);
            for field in &detail.fields {
                let pad = width - field.name.chars().count();
                println!("  {}{} : {}", field.name, " ".repeat(pad), field.value);
            }
            let status = if detail.ambiguous {
                format!("{} rows share this key, showing the first", detail.matches)
            } else {
                String::from("ok")
            };
            (status, true)
        }
        Err(SearchError::NotFound { .. }) => (String::from("not found"), false),
        Err(e) => (e.to_string(), false),
    }
}

fn export(tables: &Tables, screen: &Screen, target: &str) -> Result<(), Box<dyn std::error::Error>> {
    if target.is_empty() {
        return Err("usage: export <file.csv|file.xlsx>".into());
    }
    let spec = screen.view.spec();
    let table = spec.export_table(spec.table(tables), &screen.query())?;

    let path = Path::new(target);
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => fs::write(path, downloader::to_xlsx(&table)?)?,
        _ => fs::write(path, downloader::to_csv(&table))?,
    }
    Ok(())
}
