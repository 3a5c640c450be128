mod app;
mod colors;
mod config;
mod controller;
mod error;
mod game;
mod inits;
mod listview;
mod registry;
mod settings;
mod timer;
mod tooltip;
mod ui;

use anyhow::{bail, Context, Result};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut df_override = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--df-dir" | "-d" => {
                if let Some(path) = args.next() {
                    df_override = Some(PathBuf::from(path));
                } else {
                    eprintln!("--df-dir requires a path");
                }
            }
            "--help" | "-h" => {
                println!("dflaunch");
                println!("  --df-dir <path>   Use this {} folder", game::GAME_NAME);
                return Ok(());
            }
            _ => {}
        }
    }

    let mut config = config::AppConfig::load_or_create()?;
    let df_dir = match df_override {
        Some(dir) => {
            if !game::looks_like_df_dir(&dir) {
                bail!("{} is not a {} folder", dir.display(), game::GAME_NAME);
            }
            dir
        }
        None => match config.df_dir.clone() {
            Some(dir) => dir,
            None => choose_df_dir()?,
        },
    };
    if config.df_dir.as_ref() != Some(&df_dir) {
        config.df_dir = Some(df_dir.clone());
        config.save()?;
    }

    let mut app = app::App::initialize(config, &df_dir)?;
    ui::run(&mut app)
}

/// Finds game folders next to the launcher and asks which one to use when
/// there is more than one.
fn choose_df_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("read current dir")?;
    let mut found = game::find_df_folders(&cwd);
    match found.len() {
        0 => bail!(
            "no {} folder found in {}; pass --df-dir <path>",
            game::GAME_NAME,
            cwd.display()
        ),
        1 => Ok(found.remove(0)),
        _ => {
            println!("Several {} folders were found:", game::GAME_NAME);
            for (index, dir) in found.iter().enumerate() {
                println!("  {}) {}", index + 1, dir.display());
            }
            let stdin = io::stdin();
            loop {
                print!("Choose a folder [1-{}]: ", found.len());
                io::stdout().flush().context("flush stdout")?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line).context("read choice")? == 0 {
                    bail!("no folder chosen");
                }
                match line.trim().parse::<usize>() {
                    Ok(choice) if (1..=found.len()).contains(&choice) => {
                        return Ok(found.remove(choice - 1));
                    }
                    _ => println!("Enter a number between 1 and {}", found.len()),
                }
            }
        }
    }
}
