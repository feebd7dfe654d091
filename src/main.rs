// src/main.rs
use std::env;
use std::io::{self, Write};

use log::{debug, info, warn};

use stratadb::engine::{Engine, DEFAULT_DATA_DIR};
use stratadb::sql::parse_statement;

fn main() -> io::Result<()> {
    env_logger::init();
    let data_dir = env::args().nth(1).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    info!("StrataDB v0.1, data in '{}'. Type quit or .exit to leave.", data_dir);

    let mut engine = match Engine::open(&data_dir) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: cannot open '{}': {}", data_dir, e);
            std::process::exit(1);
        }
    };

    loop {
        print!("SQL> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case(".exit") {
            break;
        }

        let stmt = match parse_statement(trimmed) {
            Ok(stmt) => stmt,
            Err(e) => {
                println!("Error: {}", e);
                continue;
            }
        };
        debug!("parsed {:?}", stmt);
        match engine.execute(stmt) {
            Ok(result) => println!("{}", result),
            Err(e) => {
                warn!("statement failed: {}", e);
                println!("Error: {}", e);
            }
        }
    }
    Ok(())
}
