// ==========================================
// 增量对账引擎 - 产品主数据审核管道
// ==========================================
// 操作:
//   GenerateReview   新 SKU 候选 → SKU Base → 分类级联 → 属性推断 → 审核工作文件
//   ApplyReview      已确认变更 → MasterUpsert → HTS/PWT 字段 → 品牌标准化
//                    → Brand Group / 分组列查表 → 写回产品主数据
//   RefreshWorkfiles 由产品主数据重建 HTS / PWT 工作文件状态
// 红线: 主数据与 GPP/Brand/PSD 参考表缺失为致命；工作文件缺失按空表处理
// ==========================================

use crate::config::paths::PathLayout;
use crate::config::rule_tables::RuleTables;
use crate::domain::product::{
    master_product_columns, product_cols as pc, review_columns, ProductCandidate,
    CLASSIFICATION_ALLOW_LIST, GPP_GROUP_COLUMNS, HTS_UPDATE_COLUMNS, PWT_UPDATE_COLUMNS,
};
use crate::domain::record_set::RecordSet;
use crate::domain::run_log::RunLogEntry;
use crate::domain::types::{RunStatus, MISSING};
use crate::engine::attribute_rules::AttributeRules;
use crate::engine::brand::BrandStandardizer;
use crate::engine::classification::{ClassificationCascade, ClassificationReferences};
use crate::engine::lookup::{exact, update_by_key};
use crate::engine::master_upsert::MasterUpsert;
use crate::engine::sku_review::{
    accepted_changes, collect_new_products, inconsistent_bases, COUNTRY_MATERIAL_COLUMNS,
    GLOBAL_MATERIAL_COLUMNS,
};
use crate::engine::workfile_status::{build_workfile, WorkfileKind};
use crate::importer::data_cleaner::compact_upper;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{read_extract_dir, UniversalFileParser};
use crate::importer::importer_trait::{FileParser, PipelineRunner};
use crate::importer::reference_loader::{load_optional, load_reference};
use crate::importer::run_recorder::RunRecorder;
use crate::repository::table_file_repo::TableFileRepository;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// GPP / Brand 参考文件中的工作表
pub const GPP_SHEET: &str = "GPP";
pub const BRAND_SHEET: &str = "Brand";
/// PSD 共享清单的工作表
pub const PSD_SHEET: &str = "SKU";

/// 主数据最终排序列
const MASTER_SORT_COLUMNS: [&str; 5] = [pc::GPP, pc::SKU_BASE, pc::SKU, pc::BRAND, pc::SKU_DESCRIPTION];

/// 审核管道的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOperation {
    GenerateReview,
    ApplyReview,
    RefreshWorkfiles,
}

impl ReviewOperation {
    pub fn pipeline_name(&self) -> &'static str {
        match self {
            ReviewOperation::GenerateReview => "sku_review_generate",
            ReviewOperation::ApplyReview => "sku_review_apply",
            ReviewOperation::RefreshWorkfiles => "workfiles_refresh",
        }
    }
}

// ==========================================
// ProductReviewImporter
// ==========================================
pub struct ProductReviewImporter {
    operation: ReviewOperation,
    layout: PathLayout,
    tables: RuleTables,

    file_parser: Box<dyn FileParser>,
    table_repo: TableFileRepository,
    cascade: ClassificationCascade,

    recorder: RunRecorder,
}

impl ProductReviewImporter {
    pub fn new(
        operation: ReviewOperation,
        layout: PathLayout,
        tables: RuleTables,
        recorder: RunRecorder,
    ) -> Self {
        Self {
            operation,
            layout,
            tables,
            file_parser: Box::new(UniversalFileParser),
            table_repo: TableFileRepository::new(),
            cascade: ClassificationCascade::default(),
            recorder,
        }
    }

    fn load_master(&self) -> ImportResult<RecordSet> {
        load_reference(
            self.file_parser.as_ref(),
            &self.layout.product_master_file,
            None,
            "product_master",
        )
    }

    fn read_extracts(&self, dir: &Path, sku_column: &str) -> ImportResult<RecordSet> {
        Ok(read_extract_dir(self.file_parser.as_ref(), dir, &[sku_column])?.records)
    }

    // ===== GenerateReview =====

    /// 生成审核工作文件
    ///
    /// # 返回
    /// - NoInput: 没有新 SKU 且主数据无分类不一致的 SKU Base（不写文件）
    pub fn generate_review(&self, entry: &mut RunLogEntry) -> ImportResult<RunStatus> {
        // === 步骤 1: 读取抽取与参考表 ===
        debug!("步骤 1: 读取抽取文件与参考表");
        let fill_rate = self.read_extracts(&self.layout.fill_rate.update_dir, COUNTRY_MATERIAL_COLUMNS.sku)?;
        let sales = self.read_extracts(&self.layout.sales.update_dir, COUNTRY_MATERIAL_COLUMNS.sku)?;
        let demand = self.read_extracts(&self.layout.demand.update_dir, GLOBAL_MATERIAL_COLUMNS.sku)?;

        let master = self.load_master()?;
        let gpp_reference = load_reference(
            self.file_parser.as_ref(),
            &self.layout.gpp_brand_file,
            Some(GPP_SHEET),
            "gpp",
        )?;
        let psd_list = load_reference(
            self.file_parser.as_ref(),
            &self.layout.psd_shared_file,
            Some(PSD_SHEET),
            "psd_shared",
        )?;
        entry.historical_rows = master.len();

        // === 步骤 2: 新 SKU 候选 ===
        debug!("步骤 2: 抽取新 SKU 候选");
        let mut candidates = collect_new_products(&[&fill_rate, &sales], &demand, &master);
        entry.incoming_rows = candidates.len();

        // === 步骤 3: 分类级联与属性推断 ===
        debug!("步骤 3: 分类级联与属性推断");
        let references =
            ClassificationReferences::build(&master, &gpp_reference, &psd_list, &self.tables.psd_gpp)?;
        let summary = self.cascade.classify_all(&mut candidates, &references);
        let rules = AttributeRules::new(self.tables.clone());
        for candidate in candidates.iter_mut() {
            rules.apply(candidate);
        }
        candidates.sort_by_key(|c: &ProductCandidate| c.gpp_source.output_rank());

        // === 步骤 4: 合并分类不一致的 SKU Base ===
        debug!("步骤 4: 合并分类不一致的 SKU Base");
        let columns: Vec<String> = review_columns().iter().map(|c| c.to_string()).collect();
        let new_rows = candidates.iter().map(|c| c.to_review_row()).collect();
        let flagged = inconsistent_bases(&master);
        let flagged_rows = flagged.len();
        let review = RecordSet::from_rows(columns, new_rows).concat(flagged);

        if review.is_empty() {
            info!("没有需要审核的 SKU，跳过生成审核工作文件");
            return Ok(RunStatus::NoInput);
        }

        // === 步骤 5: 写出审核工作文件 ===
        entry.final_rows = review.len();
        self.table_repo.write_table(&self.layout.review_workfile, &review)?;
        info!(
            new_skus = candidates.len(),
            by_sku_base = summary.by_sku_base,
            by_portfolio = summary.by_portfolio,
            by_shared_list = summary.by_shared_list,
            unresolved = summary.unresolved,
            inconsistent_base_rows = flagged_rows,
            "审核工作文件已生成"
        );
        Ok(RunStatus::Success)
    }

    // ===== ApplyReview =====

    /// 将审核结果与 HTS/PWT 工作文件回写产品主数据
    pub fn apply_review(&self, entry: &mut RunLogEntry) -> ImportResult<RunStatus> {
        // === 步骤 1: 读取主数据与工作文件 ===
        debug!("步骤 1: 读取主数据与工作文件");
        let master = self.load_master()?;
        let review = load_optional(
            self.file_parser.as_ref(),
            &self.layout.review_workfile,
            None,
            "review_workfile",
        )?;
        let hts = load_optional(self.file_parser.as_ref(), &self.layout.hts_workfile, None, "hts_workfile")?;
        let pwt = load_optional(self.file_parser.as_ref(), &self.layout.pwt_workfile, None, "pwt_workfile")?;
        let brand_reference = load_reference(
            self.file_parser.as_ref(),
            &self.layout.gpp_brand_file,
            Some(BRAND_SHEET),
            "brand",
        )?;
        let gpp_reference = load_reference(
            self.file_parser.as_ref(),
            &self.layout.gpp_brand_file,
            Some(GPP_SHEET),
            "gpp",
        )?;
        entry.historical_rows = master.len();

        // === 步骤 2: 已确认变更回写 ===
        debug!("步骤 2: MasterUpsert");
        let accepted = if review.is_empty() {
            RecordSet::with_schema(&[pc::SKU])
        } else {
            accepted_changes(&review)
        };
        entry.incoming_rows = accepted.len();
        let columns = master_product_columns();
        let upsert = MasterUpsert::new(pc::SKU, &CLASSIFICATION_ALLOW_LIST, &columns);
        let outcome = upsert.apply(master, &accepted)?;
        entry.superseded_rows = outcome.updated;
        let mut products = outcome.records;

        // === 步骤 3: HTS / PWT 字段 ===
        debug!("步骤 3: HTS / PWT 字段");
        if !hts.is_empty() {
            let updated = update_by_key(&mut products, &hts, "hts_workfile", pc::SKU, pc::SKU, &HTS_UPDATE_COLUMNS, exact)?;
            debug!(updated = updated, "HTS 字段已更新");
        }
        if !pwt.is_empty() {
            let updated = update_by_key(&mut products, &pwt, "pwt_workfile", pc::SKU, pc::SKU, &PWT_UPDATE_COLUMNS, exact)?;
            debug!(updated = updated, "PWT 字段已更新");
        }

        // === 步骤 4: 品牌与分组列 ===
        debug!("步骤 4: 品牌标准化与分组列");
        let standardized = BrandStandardizer::new(&self.tables.brand_standards).apply(&mut products);
        update_by_key(&mut products, &brand_reference, "brand", pc::BRAND, pc::BRAND, &[pc::BRAND_GROUP], exact)?;
        for row in products.rows_mut() {
            let brand = row.get(pc::BRAND).cloned().unwrap_or_else(|| MISSING.to_string());
            let sbu = row.get(pc::GPP_SBU).cloned().unwrap_or_else(|| MISSING.to_string());
            row.insert(pc::BRAND_SBU.to_string(), format!("{}-{}", brand, sbu));
        }
        update_by_key(&mut products, &gpp_reference, "gpp", pc::GPP, pc::GPP, &GPP_GROUP_COLUMNS, compact_upper)?;

        // === 步骤 5: 写回 ===
        debug!("步骤 5: 写回产品主数据");
        let mut products = products.select(&columns, MISSING);
        products.sort_by_columns(&MASTER_SORT_COLUMNS);
        entry.final_rows = products.len();
        self.table_repo.write_table(&self.layout.product_master_file, &products)?;

        info!(
            accepted = accepted.len(),
            updated = outcome.updated,
            inserted = outcome.inserted,
            standardized_brands = standardized,
            total = products.len(),
            "产品主数据已更新"
        );
        Ok(RunStatus::Success)
    }

    // ===== RefreshWorkfiles =====

    /// 重建 HTS / PWT 工作文件
    pub fn refresh_workfiles(&self, entry: &mut RunLogEntry) -> ImportResult<RunStatus> {
        let master = self.load_master()?;
        entry.historical_rows = master.len();

        let mut total = 0;
        for (kind, path) in [
            (WorkfileKind::Hts, &self.layout.hts_workfile),
            (WorkfileKind::Pwt, &self.layout.pwt_workfile),
        ] {
            let existing = load_optional(self.file_parser.as_ref(), path, None, kind.as_str())?;
            let workfile = build_workfile(kind, &master, &existing);
            if workfile.is_empty() {
                warn!(workfile = kind.as_str(), sbu = kind.sbu(), "主数据中没有对应 SBU 的 SKU");
            }
            total += workfile.len();
            self.table_repo.write_table(path, &workfile)?;
        }
        entry.final_rows = total;
        Ok(RunStatus::Success)
    }
}

impl PipelineRunner for ProductReviewImporter {
    fn pipeline_name(&self) -> &str {
        self.operation.pipeline_name()
    }

    #[instrument(skip(self), fields(operation = self.operation.pipeline_name()))]
    fn run(&self) -> ImportResult<RunLogEntry> {
        info!(operation = self.operation.pipeline_name(), "开始产品主数据管道");
        let mut entry = RunLogEntry::start(self.pipeline_name());

        let result = match self.operation {
            ReviewOperation::GenerateReview => self.generate_review(&mut entry),
            ReviewOperation::ApplyReview => self.apply_review(&mut entry),
            ReviewOperation::RefreshWorkfiles => self.refresh_workfiles(&mut entry),
        };
        match result {
            Ok(RunStatus::NoInput) => {
                self.recorder
                    .finish(entry, RunStatus::NoInput, Some("没有需要审核的 SKU".to_string()))
            }
            Ok(status) => self.recorder.finish(entry, status, None),
            Err(e) => Err(self.recorder.fail(entry, e)),
        }
    }
}
