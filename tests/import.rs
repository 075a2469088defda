mod common;

use std::fs;

use common::{EVAL_HEADER, TestWorkspace};
use csv_evalboard::{
    data::CellValue,
    infer::ColumnType,
    schema::build_schema,
    service::{EvalService, ImportOutcome},
    store::Store,
};

#[test]
fn single_row_round_trips_with_padded_metric() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "data.csv",
        "ds_a,v1,acc,p1,train,score\nset1_v2,1.0,acc,p1,train,87\n",
    );
    let service = EvalService::new(workspace.settings()).expect("service");

    assert_eq!(service.import(false), ImportOutcome::Updated { rows: 1 });

    let view = service.raw_view();
    assert_eq!(view.notice, None);
    assert_eq!(
        view.table.headers,
        vec!["id", "dataset", "version", "metric", "parameter", "mode", "score"]
    );
    assert_eq!(
        view.table.rows,
        vec![vec!["1", "set1_v2", "1.0", "acc", "p1", "train", "87.00"]]
    );
}

#[test]
fn unchanged_source_is_not_reimported() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "data.csv",
        &format!("{EVAL_HEADER},score\nsetA_1,v1,acc,p,eval,80\nsetA_2,v1,acc,p,eval,90\n"),
    );
    let service = EvalService::new(workspace.settings()).expect("service");

    assert_eq!(service.import(false), ImportOutcome::Updated { rows: 2 });
    let marker = service.marker().read().expect("marker").expect("marker written");

    let second = service.import(false);
    assert_eq!(second, ImportOutcome::Unchanged);
    assert_eq!(second.count(), -1);
    assert_eq!(second.to_string(), "no update");
    assert_eq!(service.marker().read().expect("marker"), Some(marker));

    let store = Store::open(&workspace.store_path()).expect("store");
    assert_eq!(store.count_rows("ModelEvaluation").expect("count"), 2);
}

#[test]
fn forced_reimport_replaces_schema_and_rows() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write(
        "data.csv",
        &format!("{EVAL_HEADER},score,old_metric\na,v1,acc,p,eval,1,2\nb,v1,acc,p,eval,3,4\n"),
    );
    let service = EvalService::new(workspace.settings()).expect("service");
    assert_eq!(service.import(false), ImportOutcome::Updated { rows: 2 });

    fs::write(&csv, format!("{EVAL_HEADER},new_metric\nc,v2,f1,p,eval,0.5\n")).expect("edit");
    assert_eq!(service.import(true), ImportOutcome::Updated { rows: 1 });

    let store = Store::open(&workspace.store_path()).expect("store");
    assert_eq!(
        store.table_columns("ModelEvaluation").expect("columns"),
        vec!["id", "dataset", "version", "metric", "parameter", "mode", "new_metric"]
    );
    let rows = store.raw_table("ModelEvaluation").expect("rows").rows;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], CellValue::Text("c".to_string()));
    assert_eq!(rows[0][6], CellValue::Real(0.5));
}

#[test]
fn edited_source_is_reimported_without_force() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write("data.csv", &format!("{EVAL_HEADER},score\na,v1,acc,p,eval,1\n"));
    let service = EvalService::new(workspace.settings()).expect("service");
    assert_eq!(service.import(false), ImportOutcome::Updated { rows: 1 });

    fs::write(
        &csv,
        format!("{EVAL_HEADER},score\na,v1,acc,p,eval,1\nb,v1,acc,p,eval,2\n"),
    )
    .expect("edit");
    assert_eq!(service.import(false), ImportOutcome::Updated { rows: 2 });
}

#[test]
fn fixture_with_cjk_headers_infers_every_column_kind() {
    let workspace = TestWorkspace::new();
    let csv = workspace.copy_fixture("evaluations.csv");
    let mut settings = workspace.settings();
    settings.csv_path = csv.clone();

    let schema = build_schema(&csv, &settings).expect("schema");
    let described = schema
        .metrics
        .iter()
        .map(|c| (c.normalized_name.as_str(), c.inferred_type))
        .collect::<Vec<_>>();
    assert_eq!(
        described,
        vec![
            ("col_6", ColumnType::Decimal),
            ("top_1_acc", ColumnType::Decimal),
            ("loss", ColumnType::Text),
            ("run_date", ColumnType::DateTime),
            ("col_10", ColumnType::Text),
        ]
    );
    assert!(schema.create_table_sql().contains("col_6 DECIMAL(10, 4)"));

    settings.preserve_script = true;
    let preserved = build_schema(&csv, &settings).expect("schema");
    assert_eq!(preserved.metrics[0].normalized_name, "准确率");
    assert_eq!(preserved.metrics[1].normalized_name, "Top_1_Acc");
    assert!(preserved.create_table_sql().contains("\"准确率\" DECIMAL(10, 4)"));

    let service = EvalService::new(settings).expect("service");
    assert_eq!(service.import(false), ImportOutcome::Updated { rows: 6 });
}

#[test]
fn short_header_fails_without_writing_marker() {
    let workspace = TestWorkspace::new();
    workspace.write("data.csv", "dataset,version\na,v1\n");
    let service = EvalService::new(workspace.settings()).expect("service");

    let outcome = service.import(false);
    match &outcome {
        ImportOutcome::Failed { reason } => assert!(reason.contains("identifier column"), "{reason}"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(outcome.count(), 0);
    assert!(!service.marker().path().exists());
}
