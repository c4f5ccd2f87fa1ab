use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::num::NonZeroUsize;
use tracing_subscriber::EnvFilter;

use tabula::error_display::{user_message_from_filter, user_message_from_report};
use tabula::render::{render, RenderOptions};
use tabula::{
    run, AppConfig, Args, ConfigManager, FilterSpec, FormatterRegistry, LoadOptions,
    PipelineRequest, SortSpec, ViewManager, ViewSettings,
};

fn init_logging(args: &Args, config: &AppConfig) {
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let config_manager = ConfigManager::new(tabula::APP_NAME)?;
        let path = config_manager.write_default_config(args.force)?;
        println!("Configuration file written to {}", path.display());
        return Ok(Some(()));
    }

    if args.list_views {
        let config_manager = ConfigManager::new(tabula::APP_NAME)?;
        let views = ViewManager::new(&config_manager)?;
        if views.all_views().is_empty() {
            println!("No saved views");
        }
        for view in views.all_views() {
            let settings = &view.settings;
            let sort = settings
                .sort
                .as_ref()
                .map(|s| format!("{} {}", s.column, s.direction.as_str()))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}\tquery={:?}\tfilters={}\tsort={}\tused={}",
                view.name,
                settings.query,
                settings.filters.len(),
                sort,
                view.usage_count
            );
        }
        return Ok(Some(()));
    }

    if args.remove_views {
        let config_manager = ConfigManager::new(tabula::APP_NAME)?;
        let mut views = ViewManager::new(&config_manager)?;
        let removed = views.remove_all_views()?;
        println!("Removed {} saved view(s)", removed);
        return Ok(Some(()));
    }

    Ok(None)
}

fn page_size(args: &Args, config: &AppConfig) -> Result<NonZeroUsize> {
    let size = args.page_size.unwrap_or(config.pagination.page_size);
    NonZeroUsize::new(size).ok_or_else(|| eyre!("--page-size must be greater than 0"))
}

/// Start from a saved view (if any), then layer the command line on top.
fn build_request(
    args: &Args,
    config: &AppConfig,
    table: &tabula::Table,
    views: &mut ViewManager,
) -> Result<PipelineRequest> {
    let default_page_size = page_size(args, config)?;
    let mut request = match &args.view {
        Some(name) => {
            let view = views
                .get_view_by_name(name)
                .ok_or_else(|| eyre!("No view named '{}'. Use --list-views to see saved views.", name))?;
            let request = view
                .settings
                .to_request(&table.columns, default_page_size)
                .map_err(|e| eyre!("View '{}': {}", name, user_message_from_filter(&e)))?;
            views.record_use(name)?;
            request
        }
        None => PipelineRequest::default().with_page_size(default_page_size),
    };

    if let Some(query) = &args.search {
        request = request.with_query(query.clone());
    }
    if let Some(size) = args.page_size {
        request = request.with_page_size(
            NonZeroUsize::new(size).ok_or_else(|| eyre!("--page-size must be greater than 0"))?,
        );
    }
    if !args.filters.is_empty() {
        let mut filters = request.filters.clone();
        for expr in &args.filters {
            let spec = FilterSpec::parse(expr)?;
            filters.push(spec, &table.columns)?;
        }
        request = request.with_filters(filters);
    }
    if let Some(column) = &args.sort {
        let spec = if args.descending {
            SortSpec::descending(column.as_str())
        } else {
            SortSpec::ascending(column.as_str())
        };
        if table.columns.get(column).is_none() {
            tracing::warn!(column = %column, "sort column not found; rows keep file order");
        }
        request = request.with_sort(Some(spec));
    }
    if let Some(page) = args.page {
        request = request.with_page(page);
    }
    Ok(request)
}

fn run_app(args: &Args, config: &AppConfig) -> Result<()> {
    let path = args
        .path
        .as_ref()
        .ok_or_else(|| eyre!("A data file path is required"))?;

    let options = LoadOptions {
        format: args.format,
        compression: args.compression,
        delimiter: args.delimiter,
        id_column: args.id_column.clone(),
    };
    let mut table = tabula::load(path, &options)?;

    for key in config.apply_to(&mut table.columns) {
        tracing::warn!(column = %key, "config overrides a column that is not in the file");
    }
    let registry = FormatterRegistry::with_builtins_for(&config.display_options());
    for id in table.columns.resolve_formatters(&registry) {
        tracing::warn!(formatter = %id, known = ?registry.ids(), "unknown formatter; using default formatting");
    }

    let config_manager = ConfigManager::new(tabula::APP_NAME)?;
    let mut views = ViewManager::new(&config_manager)?;
    let request = build_request(args, config, &table, &mut views)?;

    let result = run(&table.rows, &request, &table.columns);
    let render_options = RenderOptions {
        cell_padding: config.display.cell_padding,
        max_column_width: config.display.max_column_width,
        max_columns: args.max_columns.or(config.display.max_columns),
    };
    print!("{}", render(&result, &table.columns, &render_options));

    if let Some(name) = &args.save_view {
        views.create_view(name.clone(), None, ViewSettings::from_request(&request))?;
        println!("Saved view '{}'", name);
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = AppConfig::load(tabula::APP_NAME)?;
    init_logging(&args, &config);

    if let Err(e) = run_app(&args, &config) {
        eprintln!("Error: {}", user_message_from_report(&e, args.path.as_deref()));
        std::process::exit(1);
    }
    Ok(())
}
