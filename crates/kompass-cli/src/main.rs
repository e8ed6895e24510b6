// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use kompass_app::{HierarchyError, ItemGroups, ItemStore, Navigator};
use runtime::FileRuntime;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Width assumed until the terminal reports its size.
const INITIAL_WIDTH_PX: u32 = 1200;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `kompass --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let groups = if options.demo {
        kompass_testkit::demo_curriculum()
    } else {
        let data_path = options.data_path.clone().or_else(|| config.data_path()).ok_or_else(|| {
            anyhow!(
                "no curriculum file; pass --data <path>, set [data].path in {}, or run with --demo",
                options.config_path.display()
            )
        })?;
        load_curriculum(&data_path)?
    };
    let store = ItemStore::from_groups(&groups);

    if options.check_only {
        let report = CheckReport::from_store(&store);
        for problem in &report.problems {
            eprintln!("{problem}");
        }
        println!("{}", report.summary());
        if !report.is_clean() {
            bail!("curriculum check found {} problem(s)", report.problems.len());
        }
        return Ok(());
    }

    init_logging(&config)?;
    let ui = config.ui_options()?;
    let mut runtime = if options.demo {
        FileRuntime::ephemeral(config.confirm_uncheck())
    } else {
        FileRuntime::open(config.state_path()?, config.confirm_uncheck())?
    };

    info!(items = store.len(), demo = options.demo, "curriculum loaded");
    let mut nav = Navigator::new(store, INITIAL_WIDTH_PX);
    kompass_tui::run_app(&mut nav, &mut runtime, ui)
}

fn load_curriculum(path: &Path) -> Result<ItemGroups> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!(
            "read curriculum {} -- if this path is wrong, pass --data or set [data].path",
            path.display()
        )
    })?;
    ItemGroups::from_json_str(&raw).with_context(|| format!("load curriculum {}", path.display()))
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .context("build log filter")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("install log subscriber")
}

/// Result of `--check`: item validation plus the hierarchy walk.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CheckReport {
    items: usize,
    problems: Vec<String>,
}

impl CheckReport {
    fn from_store(store: &ItemStore) -> Self {
        let mut problems = store
            .iter()
            .flat_map(|item| {
                item.validate()
                    .into_iter()
                    .map(move |message| format!("item {}: {message}", item.id))
            })
            .collect::<Vec<_>>();
        problems.extend(
            store
                .check_hierarchy()
                .iter()
                .map(HierarchyError::to_string),
        );
        Self {
            items: store.len(),
            problems,
        }
    }

    fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    fn summary(&self) -> String {
        if self.is_clean() {
            format!("ok: {} items", self.items)
        } else {
            format!("{} items, {} problem(s)", self.items, self.problems.len())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    data_path: Option<PathBuf>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        data_path: None,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--data" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--data requires a curriculum JSON path"))?;
                options.data_path = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("kompass");
    println!("  --config <path>          Use a specific config path");
    println!("  --data <path>            Curriculum JSON to explore");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with a generated demo curriculum");
    println!("  --check                  Validate config + curriculum and exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CheckReport, CliOptions, load_curriculum, parse_cli_args};
    use anyhow::Result;
    use kompass_app::ItemStore;
    use kompass_testkit::{CurriculumBuilder, chain, demo_curriculum, write_curriculum_file};
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/kompass-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                data_path: None,
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_and_data_paths() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml", "--data", "plan.json"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(options.data_path, Some(PathBuf::from("plan.json")));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--data"], default_options_path())
            .expect_err("missing data value should fail");
        assert!(error.to_string().contains("--data requires"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_demo_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--demo", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.demo);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn check_report_is_clean_for_the_demo() {
        let store = ItemStore::from_groups(&demo_curriculum());
        let report = CheckReport::from_store(&store);
        assert!(report.is_clean());
        assert_eq!(report.summary(), format!("ok: {} items", store.len()));
    }

    #[test]
    fn check_report_lists_nameless_items_and_orphans() {
        let mut groups = CurriculumBuilder::new()
            .group("root", &[("a", "A"), ("blank", " ")])
            .build();
        groups.push(
            kompass_app::ParentId::from_key("ghost"),
            [kompass_app::ItemInput::new("orphan", "Orphan")],
        );
        let report = CheckReport::from_store(&ItemStore::from_groups(&groups));

        assert!(!report.is_clean());
        assert_eq!(report.problems.len(), 2);
        assert!(report.problems[0].contains("item blank"));
        assert!(report.problems[1].contains("missing parent ghost"));
        assert_eq!(report.summary(), "3 items, 2 problem(s)");
    }

    #[test]
    fn curriculum_loads_from_disk() -> Result<()> {
        let (_dir, path) = write_curriculum_file(&chain(&["a", "b"]))?;
        let groups = load_curriculum(&path)?;
        assert_eq!(groups.item_count(), 2);
        Ok(())
    }

    #[test]
    fn missing_curriculum_names_the_flag() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let error = load_curriculum(&temp.path().join("absent.json"))
            .expect_err("missing file should fail");
        assert!(error.to_string().contains("--data"));
        Ok(())
    }
}
