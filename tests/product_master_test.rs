// ==========================================
// 产品主数据审核流程测试
// ==========================================
// 覆盖: 抽取新 SKU → 生成审核文件 → 人工确认 → 回写主数据
// 参考表: GPP / Brand / PSD 以 Excel 多工作表提供
// ==========================================

mod test_helpers;

use retail_recon::config::{PathLayout, RuleTables};
use retail_recon::domain::product::HIERARCHY_COLUMNS;
use retail_recon::domain::RunStatus;
use retail_recon::importer::{PipelineRunner, ProductReviewImporter, ReviewOperation, RunRecorder};
use retail_recon::repository::partition_store::read_csv;
use retail_recon::repository::TableFileRepository;
use tempfile::TempDir;
use test_helpers::{csv_layout, record_set, write_file};

fn importer(operation: ReviewOperation, layout: &PathLayout) -> ProductReviewImporter {
    ProductReviewImporter::new(
        operation,
        layout.clone(),
        RuleTables::default(),
        RunRecorder::disabled(),
    )
}

fn prepare(base: &std::path::Path) -> PathLayout {
    let layout = csv_layout(base);
    let repo = TableFileRepository::new();

    write_file(
        &layout.product_master_file,
        "SKU,SKU Base,SKU Description,Brand,GPP,GPP SBU,GPP Category Description\n\
         DCD771C2,DCD771,Taladro 20V,DEWALT,PWT-10-10A-10001,PWT,Drills\n",
    );

    let mut gpp_columns = vec!["GPP"];
    gpp_columns.extend_from_slice(&HIERARCHY_COLUMNS);
    gpp_columns.extend_from_slice(&["Category Group", "Big Rock", "Top Category"]);
    let gpp = record_set(
        &gpp_columns,
        &[
            &["PWT-10-10A-10001", "PWT", "Power Tools", "Core", "10", "Drilling", "10A", "Drills", "10001", "Cordless Drills", "Drilling", "Power", "Yes"],
            &["HMT-20-20B-20002", "HMT", "Hand Tools", "Core", "20", "Measuring", "20B", "Tapes", "20002", "Measuring Tapes", "Measuring", "Hand", "No"],
            &["PSD-70-70X-70999", "PSD", "Shared", "Other", "70", "Shared", "70X", "Shared", "70999", "Shared Items", "Other", "Other", "No"],
        ],
    );
    let brands = record_set(
        &["Brand", "Brand Group"],
        &[&["DEWALT", "Professional"], &["STANLEY", "Consumer"]],
    );
    repo.write_workbook(&layout.gpp_brand_file, &[("GPP", &gpp), ("Brand", &brands)])
        .unwrap();

    let psd = record_set(&["SKU"], &[&["PSD001"]]);
    repo.write_workbook(&layout.psd_shared_file, &[("SKU", &psd)]).unwrap();

    write_file(
        &layout.sales.update_dir.join("sales.csv"),
        "Country Material,Country Material Name,LAG Brand,GPP Portfolio\n\
         DCD771C2-B3,Taladro 20V MAX,DEWALT,-\n\
         STHT30,Flexometro 5M,Stanley®,Measuring Tapes\n\
         DCD771C2,Taladro 20V,DEWALT,-\n",
    );
    write_file(
        &layout.demand.update_dir.join("demand.csv"),
        "Global Material,Global Material Description\nQQQ9,Mystery item\nPSD001,Shared item\n",
    );
    layout
}

#[test]
fn test_generate_review_orders_by_assignment_source() {
    let dir = TempDir::new().unwrap();
    let layout = prepare(dir.path());

    let entry = importer(ReviewOperation::GenerateReview, &layout).run().unwrap();
    assert_eq!(entry.status, RunStatus::Success);
    assert_eq!(entry.historical_rows, 1);
    assert_eq!(entry.incoming_rows, 4, "已在主数据中的 SKU 不应进入候选");

    let review = read_csv(&layout.review_workfile).unwrap();
    let skus: Vec<&str> = (0..review.len()).map(|i| review.value(i, "SKU")).collect();
    // SKU Base → 声明组合 → (共享清单 / 未解析 按抽取顺序)
    assert_eq!(skus, vec!["DCD771C2-B3", "STHT30", "QQQ9", "PSD001"]);

    assert_eq!(review.value(0, "SKU Base"), "DCD771");
    assert_eq!(review.value(0, "¿como se asigno gpp?"), "sku base");
    assert_eq!(review.value(0, "Corded / Cordless"), "CORDLESS");
    assert_eq!(review.value(0, "Voltaje"), "20V");
    assert_eq!(review.value(1, "GPP"), "HMT-20-20B-20002");
    assert_eq!(review.value(1, "Brand"), "Stanley®");
    assert_eq!(review.value(2, "GPP"), "-");
    assert_eq!(review.value(2, "¿como se asigno gpp?"), "sin gpp asignado");
    assert_eq!(review.value(3, "GPP"), "PSD-70-70X-70999");
    assert_eq!(review.value(3, "origen_sku"), "new sku");
    assert_eq!(review.value(3, "check_sku"), "-");
}

#[test]
fn test_apply_review_writes_accepted_rows_to_master() {
    let dir = TempDir::new().unwrap();
    let layout = prepare(dir.path());
    importer(ReviewOperation::GenerateReview, &layout).run().unwrap();

    // 人工确认前两行
    let mut review = read_csv(&layout.review_workfile).unwrap();
    for (idx, row) in review.rows_mut().iter_mut().enumerate() {
        let status = match idx {
            0 => "Verified",
            1 => " ok ",
            _ => "-",
        };
        row.insert("check_sku".to_string(), status.to_string());
    }
    TableFileRepository::new()
        .write_table(&layout.review_workfile, &review)
        .unwrap();

    let entry = importer(ReviewOperation::ApplyReview, &layout).run().unwrap();
    assert_eq!(entry.incoming_rows, 2);
    assert_eq!(entry.final_rows, 3);

    let master = read_csv(&layout.product_master_file).unwrap();
    let skus: Vec<&str> = (0..master.len()).map(|i| master.value(i, "SKU")).collect();
    // 按 GPP → SKU Base → SKU 排序
    assert_eq!(skus, vec!["STHT30", "DCD771C2", "DCD771C2-B3"]);

    assert_eq!(master.value(0, "Brand"), "STANLEY", "品牌应被标准化");
    assert_eq!(master.value(0, "Brand Group"), "Consumer");
    assert_eq!(master.value(0, "Brand + SBU"), "STANLEY-HMT");
    assert_eq!(master.value(0, "Category Group"), "Measuring");

    assert_eq!(master.value(1, "Brand Group"), "Professional");
    assert_eq!(master.value(1, "Big Rock"), "Power");

    assert_eq!(master.value(2, "SKU Base"), "DCD771");
    assert_eq!(master.value(2, "GPP"), "PWT-10-10A-10001");
    assert_eq!(master.value(2, "Brand + SBU"), "DEWALT-PWT");
    assert_eq!(master.value(2, "Top Category"), "Yes");
    // 工作文件缺失时 HTS 列保持 "-"
    assert_eq!(master.value(2, "Categoria HTS"), "-");
}

#[test]
fn test_generate_review_without_candidates_is_no_input() {
    let dir = TempDir::new().unwrap();
    let layout = prepare(dir.path());
    std::fs::remove_dir_all(&layout.sales.update_dir).unwrap();
    std::fs::remove_dir_all(&layout.demand.update_dir).unwrap();

    let entry = importer(ReviewOperation::GenerateReview, &layout).run().unwrap();
    assert_eq!(entry.status, RunStatus::NoInput);
    assert!(!layout.review_workfile.exists());
}
