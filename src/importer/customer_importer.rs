// ==========================================
// 增量对账引擎 - 客户主数据更新管道
// ==========================================
// 流程: FillRate + Sales 抽取 → 客户列合并 → 国家解析 → 渠道解析
//       → 按 (国家-客户) 主键整行替换 → 名称校正 → 写回客户主数据
// 红线: 共享客户清单 / 渠道分类表 / 名称校正表缺失均为致命
// ==========================================

use crate::config::paths::PathLayout;
use crate::config::rule_tables::RuleTables;
use crate::domain::customer::{
    customer_cols as cc, CUSTOMER_SOURCE_COLUMNS, MASTER_CUSTOMER_COLUMNS,
};
use crate::domain::dataset::CountryStrategy;
use crate::domain::record_set::RecordSet;
use crate::domain::run_log::RunLogEntry;
use crate::domain::types::RunStatus;
use crate::engine::customer_channel::{customer_key, CustomerChannelResolver, NameNotation};
use crate::engine::upsert::UpsertEngine;
use crate::importer::country_resolver::CountryResolver;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{read_extract_dir, UniversalFileParser};
use crate::importer::importer_trait::{FileParser, PipelineRunner};
use crate::importer::reference_loader::{load_optional, load_reference};
use crate::importer::run_recorder::RunRecorder;
use crate::repository::table_file_repo::TableFileRepository;
use tracing::{debug, info, instrument, warn};

/// 共享客户清单中的工作表
pub const SHARED_CUSTOMERS_SHEET: &str = "Customers_Shared_by_Country";
pub const CHANNEL_CLASSIFICATION_SHEET: &str = "Clasifications";

const PIPELINE_NAME: &str = "customers";

// ==========================================
// CustomerImporter
// ==========================================
pub struct CustomerImporter {
    layout: PathLayout,
    tables: RuleTables,
    file_parser: Box<dyn FileParser>,
    upsert_engine: UpsertEngine,
    table_repo: TableFileRepository,
    recorder: RunRecorder,
}

impl CustomerImporter {
    pub fn new(layout: PathLayout, tables: RuleTables, recorder: RunRecorder) -> Self {
        Self::with_parser(layout, tables, Box::new(UniversalFileParser), recorder)
    }

    pub fn with_parser(
        layout: PathLayout,
        tables: RuleTables,
        file_parser: Box<dyn FileParser>,
        recorder: RunRecorder,
    ) -> Self {
        Self {
            layout,
            tables,
            file_parser,
            upsert_engine: UpsertEngine::new(),
            table_repo: TableFileRepository::new(),
            recorder,
        }
    }

    /// 读取 FillRate 与 Sales 抽取目录中的客户列
    fn read_customer_extracts(&self) -> ImportResult<RecordSet> {
        let mut consolidated = RecordSet::with_schema(&CUSTOMER_SOURCE_COLUMNS);
        for dirs in [&self.layout.fill_rate, &self.layout.sales] {
            let batch = read_extract_dir(
                self.file_parser.as_ref(),
                &dirs.update_dir,
                &CUSTOMER_SOURCE_COLUMNS,
            )?;
            consolidated = consolidated.concat(batch.records.select(&CUSTOMER_SOURCE_COLUMNS, ""));
        }
        Ok(consolidated)
    }

    /// 读取现有客户主数据并补充临时主键列
    fn load_master(&self) -> ImportResult<RecordSet> {
        let master = load_optional(
            self.file_parser.as_ref(),
            &self.layout.customer_master_file,
            None,
            "customer_master",
        )?;
        if master.is_empty() {
            warn!(
                path = %self.layout.customer_master_file.display(),
                "客户主数据为空，将以本次解析结果新建"
            );
            return Ok(RecordSet::with_schema(&MASTER_CUSTOMER_COLUMNS));
        }

        let mut master = master.select(&MASTER_CUSTOMER_COLUMNS, "");
        master.ensure_column(cc::FK_COUNTRY_CUSTOMER, "");
        for row in master.rows_mut() {
            let key = customer_key(
                row.get(cc::FK_COUNTRY).map(|s| s.as_str()).unwrap_or(""),
                row.get(cc::FK_CUSTOMER).map(|s| s.as_str()).unwrap_or(""),
            );
            row.insert(cc::FK_COUNTRY_CUSTOMER.to_string(), key);
        }
        Ok(master)
    }

    fn execute(&self, entry: &mut RunLogEntry) -> ImportResult<RunStatus> {
        // === 步骤 1: 读取客户列 ===
        debug!("步骤 1: 读取 FillRate / Sales 客户列");
        let mut consolidated = self.read_customer_extracts()?;
        if consolidated.is_empty() {
            info!("没有新的客户抽取数据，跳过本次更新");
            return Ok(RunStatus::NoInput);
        }

        // === 步骤 2: 国家解析 ===
        debug!("步骤 2: 国家解析");
        let country_reference = load_reference(
            self.file_parser.as_ref(),
            &self.layout.country_codes_file,
            Some(CountryStrategy::CodeConcat.sheet_name()),
            "country_codes",
        )?;
        CountryResolver::from_reference(CountryStrategy::CodeConcat, &country_reference)?
            .assign(&mut consolidated);

        // === 步骤 3: 渠道解析 ===
        debug!("步骤 3: 渠道解析");
        let shared = load_reference(
            self.file_parser.as_ref(),
            &self.layout.customers_shared_file,
            Some(SHARED_CUSTOMERS_SHEET),
            "customers_shared",
        )?;
        let classifications = load_reference(
            self.file_parser.as_ref(),
            &self.layout.customers_shared_file,
            Some(CHANNEL_CLASSIFICATION_SHEET),
            "channel_classifications",
        )?;
        let resolver = CustomerChannelResolver::new(&shared, &classifications, self.tables.clone())?;
        let resolved = resolver.resolve_all(&consolidated)?;

        let mut incoming_columns: Vec<&str> = MASTER_CUSTOMER_COLUMNS.to_vec();
        incoming_columns.push(cc::FK_COUNTRY_CUSTOMER);
        let mut incoming = RecordSet::with_schema(&incoming_columns);
        for customer in &resolved {
            let mut row = customer.to_master_row();
            row.insert(cc::FK_COUNTRY_CUSTOMER.to_string(), customer.key.clone());
            incoming.push(row);
        }

        // === 步骤 4: 按主键替换 ===
        debug!("步骤 4: 客户主数据 Upsert");
        let master = self.load_master()?;
        entry.historical_rows = master.len();
        entry.incoming_rows = incoming.len();
        let outcome = self
            .upsert_engine
            .upsert(master, incoming, cc::FK_COUNTRY_CUSTOMER)?;
        entry.superseded_rows = outcome.superseded;
        let mut updated = outcome.records;
        updated.drop_column(cc::FK_COUNTRY_CUSTOMER);

        // === 步骤 5: 名称校正 ===
        debug!("步骤 5: 客户名称校正");
        let notation_table = load_reference(
            self.file_parser.as_ref(),
            &self.layout.customer_notation_file,
            None,
            "customer_notation",
        )?;
        let notation = NameNotation::from_reference(&notation_table)?;
        let corrected = notation.apply(&mut updated, cc::CUSTOMER_NAME_OUT);

        // === 步骤 6: 写回 ===
        debug!("步骤 6: 写回客户主数据");
        let output = updated.select(&MASTER_CUSTOMER_COLUMNS, "");
        entry.final_rows = output.len();
        self.table_repo
            .write_table(&self.layout.customer_master_file, &output)?;

        info!(
            resolved = resolved.len(),
            superseded = entry.superseded_rows,
            corrected_names = corrected,
            total = output.len(),
            "客户主数据更新完成"
        );
        Ok(RunStatus::Success)
    }
}

impl PipelineRunner for CustomerImporter {
    fn pipeline_name(&self) -> &str {
        PIPELINE_NAME
    }

    #[instrument(skip(self))]
    fn run(&self) -> ImportResult<RunLogEntry> {
        info!("开始客户主数据更新");
        let mut entry = RunLogEntry::start(PIPELINE_NAME);

        match self.execute(&mut entry) {
            Ok(RunStatus::NoInput) => {
                self.recorder
                    .finish(entry, RunStatus::NoInput, Some("抽取目录为空".to_string()))
            }
            Ok(status) => self.recorder.finish(entry, status, None),
            Err(e) => Err(self.recorder.fail(entry, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::partition_store::read_csv;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    // CSV 参考文件不区分工作表，渠道清单与分类表分别放在两个文件时
    // 无法共用一个路径，这里把两张表的列合并进同一个 CSV
    fn write_references(base: &Path) -> PathLayout {
        let mut layout = PathLayout::with_base(base);
        layout.country_codes_file = base.join("country_codes.csv");
        layout.customers_shared_file = base.join("customers_shared.csv");
        layout.customer_notation_file = base.join("notation.csv");
        layout.customer_master_file = base.join("master_customers.csv");

        fs::write(
            &layout.country_codes_file,
            "Country Code Concat,Country\nMX01MX,MEXICO\nCO01CO,COLOMBIA\n",
        )
        .unwrap();
        fs::write(
            &layout.customers_shared_file,
            "Country,fk_Customer_Code,Sold-To Dist Channel Shared,pk_Sold-To Dist Channel,fk_Sold-To Dist Type\n\
             MEXICO,123,Mass Merchant,Mass Merchant,Retail\n\
             ,,,Showrooms,Specialty\n\
             ,,,Traditional Hardware Stores,Traditional\n",
        )
        .unwrap();
        fs::write(
            &layout.customer_notation_file,
            "Text Condition,Result\nHOME DEPOT MX,The Home Depot\n",
        )
        .unwrap();
        layout
    }

    fn write_extract(dir: &Path, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("extract.csv"),
            format!(
                "Country Code,Destination Country,Sold-To Customer Code,Sold-To Customer,Sold-To Dist Channel\n{}",
                body
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_customer_master_upsert_and_notation() {
        let dir = TempDir::new().unwrap();
        let layout = write_references(dir.path());
        fs::write(
            &layout.customer_master_file,
            "fk_Country,fk_Sold-To Customer,Sold-To Customer Name,fk_Dist_Channel,fk_Dist_Type\n\
             MEXICO,MX/000123,Old Name,Showrooms,Specialty\n\
             MEXICO,999,Keep Me,Showrooms,Specialty\n",
        )
        .unwrap();
        write_extract(
            &layout.sales.update_dir,
            "MX01,MX,MX/000123,Home Depot MX,Anything\nCO01,CO,55,Ferreteria,Unknown\n",
        );

        let importer = CustomerImporter::new(layout.clone(), RuleTables::default(), RunRecorder::disabled());
        let entry = importer.run().unwrap();
        assert_eq!(entry.status, RunStatus::Success);
        assert_eq!(entry.superseded_rows, 1);

        let master = read_csv(&layout.customer_master_file).unwrap();
        assert_eq!(master.len(), 3);
        // 保留的历史记录在前
        assert_eq!(master.value(0, "Sold-To Customer Name"), "Keep Me");
        assert_eq!(master.value(1, "Sold-To Customer Name"), "The Home Depot");
        assert_eq!(master.value(1, "fk_Dist_Channel"), "Mass Merchant");
        assert_eq!(master.value(2, "fk_Country"), "COLOMBIA");
        assert_eq!(master.value(2, "fk_Dist_Channel"), "Showrooms");
        assert!(!master.has_column(cc::FK_COUNTRY_CUSTOMER));
    }

    #[test]
    fn test_no_extracts_leaves_master_untouched() {
        let dir = TempDir::new().unwrap();
        let layout = write_references(dir.path());
        let importer = CustomerImporter::new(layout.clone(), RuleTables::default(), RunRecorder::disabled());
        let entry = importer.run().unwrap();
        assert_eq!(entry.status, RunStatus::NoInput);
        assert!(!layout.customer_master_file.exists());
    }

    #[test]
    fn test_missing_notation_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut layout = write_references(dir.path());
        layout.customer_notation_file = dir.path().join("missing.xlsx");
        write_extract(&layout.fill_rate.update_dir, "MX01,MX,1,A,Industrial\n");

        let importer = CustomerImporter::new(layout.clone(), RuleTables::default(), RunRecorder::disabled());
        let err = importer.run().unwrap_err();
        assert!(err.is_fatal());
        assert!(!layout.customer_master_file.exists());
    }
}
