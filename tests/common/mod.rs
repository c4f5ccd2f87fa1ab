#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tabula::{CellValue, ColumnDef, ColumnSet, ColumnType, ConfigManager, Row};
use tempfile::TempDir;

/// Temporary config directory; keep the TempDir alive for the test's duration.
pub fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

/// Bob / alice / Carl with one missing age.
pub fn people() -> (Vec<Row>, ColumnSet) {
    let rows = vec![
        Row::new(1).with("name", "Bob").with("age", 30),
        Row::new(2).with("name", "alice").with("age", 25),
        Row::new(3).with("name", "Carl").with("age", CellValue::Null),
    ];
    let columns = ColumnSet::new(vec![
        ColumnDef::new("name", "Name").with_type(ColumnType::Text),
        ColumnDef::new("age", "Age").with_type(ColumnType::Number),
    ]);
    (rows, columns)
}

/// Ten employees across three departments.
pub fn employees() -> (Vec<Row>, ColumnSet) {
    let data = [
        (1, "Ada", "Eng", 150_000),
        (2, "Brian", "Sales", 90_000),
        (3, "Chen", "Eng", 120_000),
        (4, "Dana", "Ops", 80_000),
        (5, "Emil", "Eng", 175_000),
        (6, "Fay", "Sales", 95_000),
        (7, "Gus", "Eng", 110_000),
        (8, "Hana", "Ops", 85_000),
        (9, "Ivan", "Eng", 175_000),
        (10, "Jo", "Sales", 70_000),
    ];
    let rows = data
        .iter()
        .map(|(id, name, dept, salary)| {
            Row::new(*id)
                .with("name", *name)
                .with("department", *dept)
                .with("salary", *salary)
        })
        .collect();
    let columns = ColumnSet::new(vec![
        ColumnDef::new("name", "Name"),
        ColumnDef::new("department", "Department"),
        ColumnDef::new("salary", "Salary").with_type(ColumnType::Currency),
    ]);
    (rows, columns)
}

pub fn ids(rows: &[&Row]) -> Vec<String> {
    rows.iter().map(|r| r.id.to_string()).collect()
}

/// Write `content` to `dir/name`, returning the path.
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).expect("Failed to create sample file");
    file.write_all(content).expect("Failed to write sample file");
    path
}

pub const SAMPLE_CSV: &str = "\
id,name,department,salary,start_date,remote
1,Ada,Eng,150000,2019-03-01,true
2,Brian,Sales,90000,2020-07-15,false
3,Chen,Eng,120000,2021-01-10,yes
4,Dana,Ops,,2018-11-30,no
";
