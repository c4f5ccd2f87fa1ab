mod common;

use std::fs;
use std::num::NonZeroUsize;

use common::{employees, setup_test_config_dir};
use tabula::{
    ColumnDef, ColumnSet, FilterError, FilterOperator, FilterSet, FilterSpec, PipelineRequest,
    SortSpec, ViewManager, ViewSettings,
};

fn settings() -> ViewSettings {
    let (_, columns) = employees();
    let filters = FilterSet::new(
        vec![FilterSpec::new("department", FilterOperator::Equals, "Eng")],
        &columns,
    )
    .unwrap();
    let request = PipelineRequest::default()
        .with_query("a")
        .with_filters(filters)
        .with_sort(Some(SortSpec::descending("salary")))
        .with_page_size(NonZeroUsize::new(5).unwrap())
        .with_page(3);
    ViewSettings::from_request(&request)
}

#[test]
fn test_create_and_reload_view() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let mut views = ViewManager::new(&config_manager).unwrap();
    assert!(views.all_views().is_empty());

    let created = views
        .create_view("engineers".to_string(), Some("Eng by pay".to_string()), settings())
        .unwrap();
    assert!(config_manager
        .config_dir()
        .join("views")
        .join(format!("view_{}.json", created.id))
        .exists());

    let reloaded = ViewManager::new(&config_manager).unwrap();
    let view = reloaded.get_view_by_name("engineers").unwrap();
    assert_eq!(view.id, created.id);
    assert_eq!(view.description.as_deref(), Some("Eng by pay"));
    assert_eq!(view.settings, created.settings);
    assert_eq!(view.settings.query, "a");
    assert_eq!(view.settings.filters.len(), 1);
    assert_eq!(view.usage_count, 0);
    assert!(view.last_used.is_none());
}

#[test]
fn test_view_restores_first_page() {
    let (rows, columns) = employees();
    let request = settings()
        .to_request(&columns, NonZeroUsize::new(25).unwrap())
        .unwrap();
    assert_eq!(request.page, 1);
    assert_eq!(request.page_size.get(), 5);
    assert_eq!(request.sort, Some(SortSpec::descending("salary")));

    let result = tabula::run(&rows, &request, &columns);
    assert_eq!(result.total_count, 2);
}

#[test]
fn test_view_filters_revalidated() {
    let columns = ColumnSet::new(vec![ColumnDef::new("name", "Name")]);
    let err = settings()
        .to_request(&columns, NonZeroUsize::new(25).unwrap())
        .unwrap_err();
    assert_eq!(err, FilterError::UnknownColumn("department".to_string()));
}

#[test]
fn test_record_use_persists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let mut views = ViewManager::new(&config_manager).unwrap();
    views
        .create_view("engineers".to_string(), None, settings())
        .unwrap();

    views.record_use("engineers").unwrap();
    views.record_use("engineers").unwrap();
    assert!(views.record_use("missing").is_err());

    let reloaded = ViewManager::new(&config_manager).unwrap();
    let view = reloaded.get_view_by_name("engineers").unwrap();
    assert_eq!(view.usage_count, 2);
    assert!(view.last_used.is_some());
}

#[test]
fn test_same_name_replaces_view() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let mut views = ViewManager::new(&config_manager).unwrap();
    views
        .create_view("mine".to_string(), None, settings())
        .unwrap();
    views
        .create_view("mine".to_string(), None, ViewSettings::default())
        .unwrap();

    assert_eq!(views.all_views().len(), 1);
    assert!(views.get_view_by_name("mine").unwrap().settings.query.is_empty());
    assert!(views.create_view("  ".to_string(), None, settings()).is_err());
}

#[test]
fn test_views_listed_by_name_and_removed() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let mut views = ViewManager::new(&config_manager).unwrap();
    for name in ["zeta", "alpha", "mid"] {
        views
            .create_view(name.to_string(), None, ViewSettings::default())
            .unwrap();
    }
    let names: Vec<&str> = views.all_views().iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    assert!(views.view_exists("mid"));

    let id = views.get_view_by_name("mid").unwrap().id.clone();
    views.delete_view(&id).unwrap();
    assert!(!views.view_exists("mid"));

    assert_eq!(views.remove_all_views().unwrap(), 2);
    assert!(views.all_views().is_empty());
    assert!(ViewManager::new(&config_manager).unwrap().all_views().is_empty());
}

#[test]
fn test_corrupt_view_file_skipped() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let mut views = ViewManager::new(&config_manager).unwrap();
    views
        .create_view("good".to_string(), None, ViewSettings::default())
        .unwrap();
    let views_dir = config_manager.config_dir().join("views");
    fs::write(views_dir.join("view_broken.json"), "{ not json").unwrap();

    let reloaded = ViewManager::new(&config_manager).unwrap();
    assert_eq!(reloaded.all_views().len(), 1);
    assert_eq!(reloaded.all_views()[0].name, "good");
}

#[test]
fn test_unreadable_view_file_skipped() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let mut views = ViewManager::new(&config_manager).unwrap();
    views
        .create_view("good".to_string(), None, ViewSettings::default())
        .unwrap();
    let views_dir = config_manager.config_dir().join("views");
    // not valid UTF-8, so the file cannot be read as text
    fs::write(views_dir.join("view_binary.json"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

    let reloaded = ViewManager::new(&config_manager).unwrap();
    let names: Vec<&str> = reloaded.all_views().iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["good"]);
}
