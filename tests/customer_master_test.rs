// ==========================================
// 客户主数据更新测试
// ==========================================
// 覆盖: 渠道解析（共享清单 / 自报渠道 / 同义词 / 国家默认）
//       以及 Excel 参考表驱动的完整客户主数据管道
// ==========================================

mod test_helpers;

use retail_recon::config::RuleTables;
use retail_recon::domain::RunStatus;
use retail_recon::engine::{customer_key, CustomerChannelResolver};
use retail_recon::importer::{CustomerImporter, PipelineRunner, RunRecorder};
use retail_recon::repository::partition_store::read_csv;
use retail_recon::repository::TableFileRepository;
use tempfile::TempDir;
use test_helpers::{csv_layout, record_set, write_country_codes, write_file};

const SHARED_COLUMNS: [&str; 3] = ["Country", "fk_Customer_Code", "Sold-To Dist Channel Shared"];
const CLASS_COLUMNS: [&str; 2] = ["pk_Sold-To Dist Channel", "fk_Sold-To Dist Type"];
const CUSTOMER_COLUMNS: [&str; 4] = [
    "fk_Country",
    "Sold-To Customer Code",
    "Sold-To Customer",
    "Sold-To Dist Channel",
];

fn resolver() -> CustomerChannelResolver {
    let shared = record_set(
        &SHARED_COLUMNS,
        &[
            &["MEXICO", "123", "Mass Merchant"],
            &["MEXICO", "456", "NOT FOUND"],
        ],
    );
    let classifications = record_set(
        &CLASS_COLUMNS,
        &[
            &["Mass Merchant", "Retail"],
            &["Showrooms", "Specialty"],
            &["Traditional Hardware Stores", "Traditional"],
        ],
    );
    CustomerChannelResolver::new(&shared, &classifications, RuleTables::default()).unwrap()
}

#[test]
fn test_customer_key_normalizes_code() {
    assert_eq!(customer_key("MEXICO", "MX/000123"), "MEXICO-123");
    assert_eq!(customer_key("MEXICO", "000123"), "MEXICO-123");
    assert_eq!(customer_key("COSTA RICA", "77"), "COSTARICA-77");
}

#[test]
fn test_channel_resolution_order_and_country_defaults() {
    let customers = record_set(
        &CUSTOMER_COLUMNS,
        &[
            // 共享清单命中
            &["MEXICO", "MX/000123", "Walmart", "Industrial"],
            // 共享清单标记为未找到 → 自报渠道 → 同义词
            &["MEXICO", "456", "Coppel", "Mess Merchant"],
            // 无法识别的渠道: 哥伦比亚默认 Showrooms
            &["COLOMBIA", "900", "Ferreteria Central", "Unknown"],
            // 其余国家默认传统五金店
            &["PERU", "901", "Ferreteria Lima", "Unknown"],
            // 重复主键，首次出现为准
            &["MEXICO", "123", "Walmart Duplicate", "Showrooms"],
        ],
    );

    let resolved = resolver().resolve_all(&customers).unwrap();
    assert_eq!(resolved.len(), 4);

    assert_eq!(resolved[0].key, "MEXICO-123");
    assert_eq!(resolved[0].customer_name, "Walmart");
    assert_eq!(resolved[0].dist_channel, "Mass Merchant");
    assert_eq!(resolved[0].dist_type, "Retail");

    assert_eq!(resolved[1].dist_channel, "Mass Merchant");

    assert_eq!(resolved[2].dist_channel, "Showrooms");
    assert_eq!(resolved[2].dist_type, "Specialty");

    assert_eq!(resolved[3].dist_channel, "Traditional Hardware Stores");
    assert_eq!(resolved[3].dist_type, "Traditional");
}

#[test]
fn test_customer_pipeline_with_workbook_references() {
    let dir = TempDir::new().unwrap();
    let layout = csv_layout(dir.path());
    write_country_codes(&layout);

    let shared = record_set(&SHARED_COLUMNS, &[&["MEXICO", "123", "Mass Merchant"]]);
    let classifications = record_set(
        &CLASS_COLUMNS,
        &[&["Mass Merchant", "Retail"], &["Showrooms", "Specialty"]],
    );
    TableFileRepository::new()
        .write_workbook(
            &layout.customers_shared_file,
            &[
                ("Customers_Shared_by_Country", &shared),
                ("Clasifications", &classifications),
            ],
        )
        .unwrap();
    write_file(
        &layout.customer_notation_file,
        "Text Condition,Result\nHome Depot MX,The Home Depot\n",
    );

    let header = "Country Code,Destination Country,Sold-To Customer Code,Sold-To Customer,Sold-To Dist Channel";
    write_file(
        &layout.fill_rate.update_dir.join("fill_rate.csv"),
        &format!("{}\nMX01,MX,MX/000123,Home Depot MX,Industrial\n", header),
    );
    write_file(
        &layout.sales.update_dir.join("sales.csv"),
        &format!(
            "{}\nMX01,MX,123,Home Depot Duplicate,Industrial\nCO01,CO,55,Ferreteria,Unknown\n",
            header
        ),
    );

    let importer = CustomerImporter::new(layout.clone(), RuleTables::default(), RunRecorder::disabled());
    let entry = importer.run().unwrap();
    assert_eq!(entry.status, RunStatus::Success);
    // 无既有主数据时从空表开始
    assert_eq!(entry.historical_rows, 0);
    assert_eq!(entry.incoming_rows, 2);

    let master = read_csv(&layout.customer_master_file).unwrap();
    assert_eq!(
        master.columns(),
        &[
            "fk_Country",
            "fk_Sold-To Customer",
            "Sold-To Customer Name",
            "fk_Dist_Channel",
            "fk_Dist_Type"
        ]
    );
    assert_eq!(master.len(), 2);
    assert_eq!(master.value(0, "fk_Country"), "MEXICO");
    assert_eq!(master.value(0, "Sold-To Customer Name"), "The Home Depot");
    assert_eq!(master.value(0, "fk_Dist_Type"), "Retail");
    assert_eq!(master.value(1, "fk_Country"), "COLOMBIA");
    assert_eq!(master.value(1, "fk_Dist_Channel"), "Showrooms");

    // 再次运行: 按主键替换，不产生重复
    let entry = importer.run().unwrap();
    assert_eq!(entry.superseded_rows, 2);
    assert_eq!(read_csv(&layout.customer_master_file).unwrap().len(), 2);
}
