// ==========================================
// 上传端到端测试
// ==========================================
// 覆盖: 正常上传 / xlsx 上传 / 列名冲突 / 输入错误 / 配置不存在
//       解析失败清理 / 严格模式部分提交 / 宽松模式回退 / 表头校验
// ==========================================


use rusqlite::Connection;
use sheet_ingest::api::UploadApi;
use sheet_ingest::db::{column_names, count_rows};
use sheet_ingest::domain::types::{CoercionPolicy, InferredType};
use tempfile::TempDir;
use test_helpers::{
    count_files, create_test_db, csv_bytes, fixture_bytes, sales_rows, seed_configuration,
    test_settings, upload_tables, SALES_HEADER,
};
use uuid::Uuid;

// ==========================================
// 正常上传
// ==========================================

#[tokio::test]
async fn test_upload_csv_creates_typed_table() {
    println!("\n=== 测试: CSV 上传建表 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let content = csv_bytes(&SALES_HEADER, &sales_rows(25));
    println!("步骤 1: 上传 25 行 × 4 列");
    let report = api
        .upload_bytes("sales.csv", Some(&content), seeded.configuration_id)
        .await;
    println!("报告: {:?}", report.message);

    assert!(report.success, "上传应成功: {:?}", report.errors);
    assert_eq!(report.row_count, 25);
    assert_eq!(report.columns.len(), 4 + 3);
    assert!(report.errors.is_none());

    let table = report.destination_table.clone().unwrap();
    assert!(table.starts_with(&format!("Upload_{}_", seeded.configuration_id.simple())));

    println!("步骤 2: 检查列元数据");
    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Industry", "Product", "ProductSubType", "Code", "Qty", "Price", "Shipped"]
    );
    let types: Vec<InferredType> = report.columns.iter().map(|c| c.inferred_type).collect();
    assert_eq!(
        types,
        vec![
            InferredType::String,
            InferredType::String,
            InferredType::String,
            InferredType::String,
            InferredType::Integer,
            InferredType::Decimal,
            InferredType::DateTime,
        ]
    );

    println!("步骤 3: 检查数据库");
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, &table).unwrap(), 25);
    let db_columns = column_names(&conn, &table).unwrap();
    assert_eq!(db_columns.len(), 4 + 3 + 1);
    assert_eq!(db_columns[0], "Id");

    let (industry, product, sub_type, qty_type, shipped): (String, String, String, String, String) =
        conn.query_row(
            &format!(
                r#"SELECT "Industry", "Product", "ProductSubType", typeof("Qty"), "Shipped"
                   FROM "{}" ORDER BY "Id" LIMIT 1"#,
                table
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .unwrap();
    assert_eq!(industry, "Retail");
    assert_eq!(product, "Shoes");
    assert_eq!(sub_type, "Running");
    assert_eq!(qty_type, "integer");
    assert_eq!(shipped, "2023-03-15 06:00:00");

    println!("步骤 4: 审计副本保留");
    assert_eq!(count_files(upload_dir.path()), 1);

    println!("✓ 测试通过");
}

#[tokio::test]
async fn test_upload_file_from_disk() {
    println!("\n=== 测试: 磁盘文件上传 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let path = source_dir.path().join("monthly sales.csv");
    std::fs::write(&path, csv_bytes(&SALES_HEADER, &sales_rows(3))).unwrap();

    let report = api.upload_file(&path, seeded.configuration_id).await;
    assert!(report.success, "上传应成功: {:?}", report.errors);
    assert_eq!(report.row_count, 3);

    let saved: Vec<String> = std::fs::read_dir(upload_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].ends_with("_monthly_sales.csv"), "审计文件名: {}", saved[0]);

    println!("✓ 测试通过");
}

#[tokio::test]
async fn test_upload_xlsx_with_offset_header() {
    println!("\n=== 测试: xlsx 上传（表头在第 2 行，A 列为空） ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let mut settings = test_settings(upload_dir.path());
    settings.header_row = 2;
    let api = UploadApi::with_settings(&db_path, settings).unwrap();

    let content = fixture_bytes("sales_offset.xlsx");
    let report = api
        .upload_bytes("sales_offset.xlsx", Some(&content), seeded.configuration_id)
        .await;
    println!("报告: {:?}", report.message);
    assert!(report.success, "上传应成功: {:?}", report.errors);
    assert_eq!(report.row_count, 3);

    println!("步骤 1: 绝对坐标保留，空的 A 列按注入后的列号命名");
    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Industry",
            "Product",
            "ProductSubType",
            "Column4",
            "Code",
            "Qty",
            "Price",
            "Shipped",
            "Active"
        ]
    );

    println!("步骤 2: xlsx 数值均为浮点，整数值推断为 Decimal；日期格式单元格为 DateTime");
    let types: Vec<InferredType> = report.columns.iter().map(|c| c.inferred_type).collect();
    assert_eq!(
        types,
        vec![
            InferredType::String,
            InferredType::String,
            InferredType::String,
            InferredType::String,
            InferredType::String,
            InferredType::Decimal,
            InferredType::Decimal,
            InferredType::DateTime,
            InferredType::Boolean,
        ]
    );

    println!("步骤 3: 检查落库值");
    let table = report.destination_table.clone().unwrap();
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, &table).unwrap(), 3);
    assert_eq!(column_names(&conn, &table).unwrap().len(), 9 + 1);

    let (code, shipped, active, industry): (String, String, i64, String) = conn
        .query_row(
            &format!(
                r#"SELECT "Code", "Shipped", "Active", "Industry"
                   FROM "{}" ORDER BY "Id" LIMIT 1"#,
                table
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(code, "A-1");
    assert_eq!(shipped, "2023-03-15 00:00:00");
    assert_eq!(active, 1);
    assert_eq!(industry, "Retail");

    let half_day: String = conn
        .query_row(
            &format!(r#"SELECT "Shipped" FROM "{}" WHERE "Code" = 'A-2'"#, table),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(half_day, "2023-03-16 12:00:00");

    let (qty_total, price_total): (f64, f64) = conn
        .query_row(
            &format!(r#"SELECT SUM("Qty"), SUM("Price") FROM "{}""#, table),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!((qty_total - 18.0).abs() < 1e-9, "Qty 合计: {}", qty_total);
    assert!((price_total - 7.5).abs() < 1e-9, "Price 合计: {}", price_total);

    let blank_column_nulls: i64 = conn
        .query_row(
            &format!(r#"SELECT COUNT(*) FROM "{}" WHERE "Column4" IS NULL"#, table),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(blank_column_nulls, 3);

    assert_eq!(count_files(upload_dir.path()), 1);

    println!("✓ 测试通过");
}

// ==========================================
// 列名与代理主键/注入列冲突（SQLite 列名不区分大小写）
// ==========================================

#[tokio::test]
async fn test_id_header_does_not_collide_with_surrogate_key() {
    println!("\n=== 测试: 表头 Id 与代理主键 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let content = csv_bytes(
        &["Id", "Name"],
        &[
            vec!["10".into(), "bolt".into()],
            vec!["11".into(), "nut".into()],
        ],
    );
    let report = api
        .upload_bytes("ids.csv", Some(&content), seeded.configuration_id)
        .await;
    assert!(report.success, "上传应成功: {:?}", report.errors);

    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Industry", "Product", "ProductSubType", "Id_1", "Name"]);

    let table = report.destination_table.unwrap();
    let conn = Connection::open(&db_path).unwrap();
    let db_columns = column_names(&conn, &table).unwrap();
    assert_eq!(db_columns.len(), 2 + 3 + 1);
    assert_eq!(db_columns[0], "Id");

    let source_ids: i64 = conn
        .query_row(&format!(r#"SELECT SUM("Id_1") FROM "{}""#, table), [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(source_ids, 21);

    println!("✓ 测试通过");
}

#[tokio::test]
async fn test_lowercase_product_headers_validate_and_upload() {
    println!("\n=== 测试: 小写 product 表头与注入列 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let path = source_dir.path().join("products.csv");
    std::fs::write(
        &path,
        csv_bytes(
            &["product", "product type", "product sub type", "Qty"],
            &[
                vec!["Trail".into(), "Outdoor".into(), "Grip".into(), "3".into()],
                vec!["Road".into(), "Urban".into(), "Light".into(), "4".into()],
            ],
        ),
    )
    .unwrap();

    println!("步骤 1: 表头校验通过");
    let validation = api.validate_file(&path).await;
    assert!(validation.is_valid, "{:?}", validation.errors);

    println!("步骤 2: 同一文件上传成功，冲突列名追加后缀");
    let report = api.upload_file(&path, seeded.configuration_id).await;
    assert!(report.success, "上传应成功: {:?}", report.errors);
    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Industry",
            "Product",
            "ProductSubType",
            "product_1",
            "producttype",
            "productsubtype_1",
            "Qty"
        ]
    );

    let table = report.destination_table.unwrap();
    let conn = Connection::open(&db_path).unwrap();
    let (injected, uploaded): (String, String) = conn
        .query_row(
            &format!(
                r#"SELECT "Product", "product_1" FROM "{}" ORDER BY "Id" LIMIT 1"#,
                table
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(injected, "Shoes");
    assert_eq!(uploaded, "Trail");

    println!("✓ 测试通过");
}

// ==========================================
// 输入错误与查找错误: 无副作用
// ==========================================

#[tokio::test]
async fn test_missing_or_empty_content_has_no_side_effects() {
    println!("\n=== 测试: 未上传/空文件 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let missing = api
        .upload_bytes("sales.csv", None, seeded.configuration_id)
        .await;
    assert!(!missing.success);
    assert!(missing.message.starts_with("InputError"), "{}", missing.message);
    assert!(missing.destination_table.is_none());
    assert_eq!(missing.row_count, 0);
    assert!(missing.columns.is_empty());

    let empty = api
        .upload_bytes("sales.csv", Some(&[]), seeded.configuration_id)
        .await;
    assert!(!empty.success);
    assert!(empty.message.starts_with("InputError"), "{}", empty.message);
    assert_eq!(empty.errors.as_ref().map(Vec::len), Some(1));

    let unnamed = api
        .upload_bytes("  ", Some(b"a,b\n1,2\n"), seeded.configuration_id)
        .await;
    assert!(!unnamed.success);
    assert!(unnamed.message.starts_with("InputError"));

    assert_eq!(count_files(upload_dir.path()), 0);
    assert!(upload_tables(&db_path).is_empty());

    println!("✓ 测试通过");
}

#[tokio::test]
async fn test_unsupported_extension_is_rejected() {
    println!("\n=== 测试: 不支持的扩展名 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let report = api
        .upload_bytes("notes.txt", Some(b"hello"), seeded.configuration_id)
        .await;
    assert!(!report.success);
    assert!(report.message.starts_with("InputError"));
    assert_eq!(count_files(upload_dir.path()), 0);

    println!("✓ 测试通过");
}

#[tokio::test]
async fn test_unknown_or_deleted_configuration_is_lookup_error() {
    println!("\n=== 测试: 配置不存在 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();
    let content = csv_bytes(&SALES_HEADER, &sales_rows(2));

    let unknown = api
        .upload_bytes("sales.csv", Some(&content), Uuid::new_v4())
        .await;
    assert!(!unknown.success);
    assert!(unknown.message.starts_with("LookupError"), "{}", unknown.message);

    println!("步骤: 软删除配置后再上传");
    let repo = sheet_ingest::repository::ReferenceRepository::new(&db_path).unwrap();
    repo.soft_delete_configuration(seeded.configuration_id).unwrap();
    let deleted = api
        .upload_bytes("sales.csv", Some(&content), seeded.configuration_id)
        .await;
    assert!(!deleted.success);
    assert!(deleted.message.starts_with("LookupError"));

    assert_eq!(count_files(upload_dir.path()), 0);
    assert!(upload_tables(&db_path).is_empty());

    println!("✓ 测试通过");
}

// ==========================================
// 写审计副本之后的失败: 删除副本
// ==========================================

#[tokio::test]
async fn test_corrupt_workbook_removes_audit_copy() {
    println!("\n=== 测试: 损坏的工作簿 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let report = api
        .upload_bytes(
            "broken.xlsx",
            Some(b"this is not a zip archive"),
            seeded.configuration_id,
        )
        .await;
    assert!(!report.success);
    assert!(report.message.starts_with("InputError"), "{}", report.message);
    assert_eq!(count_files(upload_dir.path()), 0);
    assert!(upload_tables(&db_path).is_empty());

    println!("✓ 测试通过");
}

#[tokio::test]
async fn test_blank_sheet_is_rejected_after_copy() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let report = api
        .upload_bytes("blank.csv", Some(b"\n\n"), seeded.configuration_id)
        .await;
    assert!(!report.success);
    assert_eq!(count_files(upload_dir.path()), 0);
}

#[tokio::test]
async fn test_strict_coercion_keeps_committed_batches() {
    println!("\n=== 测试: 严格模式第二批失败 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let mut settings = test_settings(upload_dir.path());
    settings.coercion_policy = CoercionPolicy::Strict;
    settings.batch_size = 1000;
    let api = UploadApi::with_settings(&db_path, settings).unwrap();

    println!("步骤 1: 2000 行，第 1500 行 Qty 非整数");
    let mut rows = sales_rows(2000);
    rows[1499][1] = "bad".to_string();
    let content = csv_bytes(&SALES_HEADER, &rows);

    let report = api
        .upload_bytes("big.csv", Some(&content), seeded.configuration_id)
        .await;
    println!("报告: {}", report.message);
    assert!(!report.success);
    assert!(report.message.starts_with("ParseError"), "{}", report.message);
    assert!(report.message.contains("bad"));

    println!("步骤 2: 首批 1000 行保留，审计副本删除");
    let tables = upload_tables(&db_path);
    assert_eq!(tables.len(), 1);
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, &tables[0]).unwrap(), 1000);
    assert_eq!(count_files(upload_dir.path()), 0);

    println!("✓ 测试通过");
}

#[tokio::test]
async fn test_lenient_coercion_stores_raw_text() {
    println!("\n=== 测试: 宽松模式回退原文 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let seeded = seed_configuration(&db_path).unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();

    let mut rows = sales_rows(20);
    rows[10][1] = "n/a".to_string();
    let content = csv_bytes(&SALES_HEADER, &rows);

    let report = api
        .upload_bytes("sales.csv", Some(&content), seeded.configuration_id)
        .await;
    assert!(report.success, "{:?}", report.errors);
    assert_eq!(report.columns[4].inferred_type, InferredType::Integer);

    let table = report.destination_table.unwrap();
    let conn = Connection::open(&db_path).unwrap();
    let stored: String = conn
        .query_row(
            &format!(r#"SELECT "Qty" FROM "{}" WHERE "Code" = 'C0010'"#, table),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, "n/a");
    assert_eq!(count_rows(&conn, &table).unwrap(), 20);

    println!("✓ 测试通过");
}

// ==========================================
// 表头校验
// ==========================================

#[tokio::test]
async fn test_validate_sheet_headers() {
    println!("\n=== 测试: 表头校验 ===");

    let (_db_file, db_path) = create_test_db().unwrap();
    let upload_dir = TempDir::new().unwrap();
    let api = UploadApi::with_settings(&db_path, test_settings(upload_dir.path())).unwrap();
    let source_dir = TempDir::new().unwrap();

    let valid_path = source_dir.path().join("valid.csv");
    std::fs::write(
        &valid_path,
        csv_bytes(
            &["product", "Product Type", "ProductSubType", "Qty"],
            &[vec!["a".into(), "b".into(), "c".into(), "1".into()]],
        ),
    )
    .unwrap();
    let valid = api.validate_file(&valid_path).await;
    assert!(valid.is_valid, "{:?}", valid.errors);
    assert!(valid.has_required_columns);
    assert!(valid.errors.is_empty());
    assert_eq!(valid.columns.len(), 4);
    assert_eq!(valid.product_type_column.as_deref(), Some("Product Type"));

    let invalid_path = source_dir.path().join("invalid.csv");
    std::fs::write(
        &invalid_path,
        csv_bytes(&["Product", "Category"], &[vec!["a".into(), "b".into()]]),
    )
    .unwrap();
    let invalid = api.validate_file(&invalid_path).await;
    assert!(!invalid.is_valid);
    assert!(!invalid.has_required_columns);
    assert_eq!(invalid.errors.len(), 2);
    assert!(invalid.errors[0].contains("ProductType"));

    println!("步骤: 校验无副作用");
    assert_eq!(count_files(upload_dir.path()), 0);
    assert!(upload_tables(&db_path).is_empty());

    let missing = api.validate_file(&source_dir.path().join("nope.csv")).await;
    assert!(!missing.is_valid);

    println!("✓ 测试通过");
}
