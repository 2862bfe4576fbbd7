//! End-to-end runs of the trafic_ingestion DAG against a temporary workdir.

use pretty_assertions::assert_eq;
use rusqlite::Connection;
use std::fs;
use trafic::{Dag, PipelineConfig, TaskId, TaskState};

const RAW: &str = "track_id; type; traveled_d; avg_speed; lat; lon; speed; lon_acc; lat_acc; time\n\
1; Car; 100.5; 20.3; 10.1; 20.2; 5.0; 0.1; 0.2; 0.0; 10.1; 20.3; 5.1; 0.1; 0.2; 0.1; \n\
2; Taxi; 48.85; 9.770344; 37.977391; 23.737688; 4.9178; 0.0518; -0.0299; 0.000000; \n\
3; Bus; 12.0; 3.5; 37.9; 23.7; 1.0; 0.0; 0.0; 0.0; 37.9; 23.8; \n";

fn workdir() -> (tempfile::TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::from_workdir(dir.path());
    fs::create_dir_all(config.raw_input.parent().unwrap()).unwrap();
    fs::write(&config.raw_input, RAW).unwrap();
    (dir, config)
}

fn table_rows(config: &PipelineConfig) -> Vec<(i64, String, Option<f64>, Option<f64>)> {
    let conn = Connection::open(&config.database).unwrap();
    let mut stmt = conn
        .prepare("SELECT track_id, type, lat, time FROM trafic_record ORDER BY id")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

#[test]
fn run_creates_processed_file_and_table() {
    let (_dir, config) = workdir();

    let run = Dag::trafic_ingestion().run(&config).unwrap();
    assert!(run.succeeded(), "{:?}", run.first_error());

    let processed = fs::read_to_string(&config.processed_output).unwrap();
    assert_eq!(
        processed,
        "track_id,type,traveled_d,avg_speed,lat,lon,speed,lon_acc,lat_acc,time\n\
         1,Car,100.5,20.3,10.1,20.2,5.0,0.1,0.2,0.0\n\
         1,Car,100.5,20.3,10.1,20.3,5.1,0.1,0.2,0.1\n\
         2,Taxi,48.85,9.770344,37.977391,23.737688,4.9178,0.0518,-0.0299,0.000000\n\
         3,Bus,12.0,3.5,37.9,23.7,1.0,0.0,0.0,0.0\n\
         3,Bus,12.0,3.5,37.9,23.8,,,,\n"
    );

    let rows = table_rows(&config);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0], (1, "Car".to_string(), Some(10.1), Some(0.0)));
    // Short trailing group: missing measurements stored as NULL
    assert_eq!(rows[4], (3, "Bus".to_string(), Some(37.9), None));
}

#[test]
fn rerun_replaces_table_contents() {
    let (_dir, config) = workdir();
    let dag = Dag::trafic_ingestion();

    dag.run(&config).unwrap();
    let first_file = fs::read(&config.processed_output).unwrap();
    let first_rows = table_rows(&config);

    dag.run(&config).unwrap();
    let second_file = fs::read(&config.processed_output).unwrap();
    let second_rows = table_rows(&config);

    assert_eq!(first_file, second_file);
    assert_eq!(first_rows, second_rows);
}

#[test]
fn shrinking_input_shrinks_table() {
    let (_dir, config) = workdir();
    let dag = Dag::trafic_ingestion();

    dag.run(&config).unwrap();
    fs::write(&config.raw_input, "caption\n9; Car; 1; 1; 1; 2; 3; 4; 5; 6; \n").unwrap();
    dag.run(&config).unwrap();

    let rows = table_rows(&config);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, 9);
}

#[test]
fn missing_raw_file_skips_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::from_workdir(dir.path());

    let run = Dag::trafic_ingestion().run(&config).unwrap();

    assert_eq!(run.state_of(TaskId::TransformData), Some(TaskState::Failed));
    assert_eq!(run.state_of(TaskId::LoadData), Some(TaskState::UpstreamFailed));
    assert!(!config.database.exists());
}
