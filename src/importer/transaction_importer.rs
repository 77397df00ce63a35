// ==========================================
// 增量对账引擎 - 交易数据集更新管道
// ==========================================
// 适用: Demand / FillRate / Sales
// 流程: 读取抽取目录 → 清洗 → 国家解析 → 字段映射与主键派生
//       → 重复键诊断 → 读取涉及期间的历史分区 → Upsert → 格式化 → 写回分区
// 红线: 参考文件缺失或存储失败时，在写出任何分区之前终止
// ==========================================

use crate::config::paths::{DatasetDirs, PathLayout};
use crate::domain::dataset::{cols, DatasetSpec};
use crate::domain::run_log::RunLogEntry;
use crate::domain::types::{DatasetKind, RunStatus};
use crate::engine::upsert::UpsertEngine;
use crate::importer::conflict_handler::ConflictHandler as ConflictHandlerImpl;
use crate::importer::country_resolver::CountryResolver;
use crate::importer::data_cleaner::DataCleaner as DataCleanerImpl;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::TransactionFieldMapper;
use crate::importer::file_parser::{read_extract_dir, UniversalFileParser};
use crate::importer::key_builder::KeyBuilder;
use crate::importer::importer_trait::{ConflictHandler, DataCleaner, FileParser, PipelineRunner};
use crate::importer::reference_loader::load_reference;
use crate::importer::run_recorder::RunRecorder;
use crate::repository::partition_store::PartitionStore;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

// ==========================================
// TransactionImporter
// ==========================================
pub struct TransactionImporter {
    spec: DatasetSpec,
    dirs: DatasetDirs,
    country_codes_file: PathBuf,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    data_cleaner: Box<dyn DataCleaner>,
    conflict_handler: Box<dyn ConflictHandler>,
    upsert_engine: UpsertEngine,

    recorder: RunRecorder,
}

impl TransactionImporter {
    /// 按路径布局创建，使用默认组件
    ///
    /// # 参数
    /// - kind: 数据集
    /// - layout: 路径布局
    /// - recorder: 运行日志记录器
    pub fn new(kind: DatasetKind, layout: &PathLayout, recorder: RunRecorder) -> Self {
        Self::with_components(
            DatasetSpec::for_kind(kind),
            layout.dataset(kind).clone(),
            layout.country_codes_file.clone(),
            Box::new(UniversalFileParser),
            Box::new(DataCleanerImpl),
            Box::new(ConflictHandlerImpl),
            recorder,
        )
    }

    /// 注入全部组件
    pub fn with_components(
        spec: DatasetSpec,
        dirs: DatasetDirs,
        country_codes_file: PathBuf,
        file_parser: Box<dyn FileParser>,
        data_cleaner: Box<dyn DataCleaner>,
        conflict_handler: Box<dyn ConflictHandler>,
        recorder: RunRecorder,
    ) -> Self {
        Self {
            spec,
            dirs,
            country_codes_file,
            file_parser,
            data_cleaner,
            conflict_handler,
            upsert_engine: UpsertEngine::new(),
            recorder,
        }
    }

    pub fn spec(&self) -> &DatasetSpec {
        &self.spec
    }

    fn execute(&self, entry: &mut RunLogEntry) -> ImportResult<RunStatus> {
        // === 步骤 1: 读取抽取目录 ===
        debug!("步骤 1: 读取抽取目录");
        let required = self.spec.required_source_columns();
        let batch = read_extract_dir(self.file_parser.as_ref(), &self.dirs.update_dir, &required)?;
        if batch.is_empty() {
            info!(dir = %self.dirs.update_dir.display(), "没有新的抽取数据，跳过本次更新");
            return Ok(RunStatus::NoInput);
        }
        let mut records = batch.records;

        // === 步骤 2: 清洗 ===
        debug!("步骤 2: 清洗 (TRIM + UPPER)");
        self.data_cleaner.clean_record_set(&mut records);

        // === 步骤 3: 国家解析 ===
        debug!("步骤 3: 国家解析");
        let reference = load_reference(
            self.file_parser.as_ref(),
            &self.country_codes_file,
            Some(self.spec.country.sheet_name()),
            "country_codes",
        )?;
        let resolver = CountryResolver::from_reference(self.spec.country, &reference)?;
        resolver.assign(&mut records);

        // === 步骤 4: 字段映射与主键派生 ===
        debug!("步骤 4: 字段映射与主键派生");
        let mapper = TransactionFieldMapper::new(self.spec.clone());
        mapper.map_records(&mut records);

        // 主键部分缺失的记录照常保留，计数后标记待审核
        let degraded: Vec<usize> = records
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| KeyBuilder::count_missing_parts(row, self.spec.key_parts) > 0)
            .map(|(idx, _)| idx)
            .collect();
        entry.degraded_rows = degraded.len();
        if let Some(first) = degraded.first() {
            warn!(
                degraded_rows = degraded.len(),
                first_row = *first,
                first_key = %records.value(*first, self.spec.key_field),
                "部分记录的主键存在缺失部分，已保留并待审核"
            );
        }

        // === 步骤 5: 重复键诊断 ===
        let duplicates = self
            .conflict_handler
            .detect_duplicates(&records, self.spec.key_field);
        if !duplicates.is_empty() {
            warn!(
                duplicates = duplicates.len(),
                first_row = duplicates[0].0,
                first_key = %duplicates[0].1,
                "新数据中存在重复主键，全部保留并整体替换历史记录"
            );
        }

        // === 步骤 6: 读取历史分区 ===
        debug!("步骤 6: 读取历史分区");
        let mut periods: Vec<String> = records
            .distinct_values(cols::FK_YEAR_MONTH)
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        periods.sort();
        entry.periods = periods.join(",");

        let store = PartitionStore::for_dataset(&self.dirs.partition_dir, &self.spec);
        let handles = store.list_partitions(&periods)?;
        let historical = store.read_partitions(&handles)?;
        entry.historical_rows = historical.len();
        entry.incoming_rows = records.len();
        info!(
            periods = %entry.periods,
            partitions = handles.len(),
            historical_rows = historical.len(),
            incoming_rows = records.len(),
            "历史分区读取完成"
        );

        // === 步骤 7: Upsert ===
        debug!("步骤 7: Upsert");
        let outcome = self
            .upsert_engine
            .upsert(historical, records, self.spec.key_field)?;
        entry.superseded_rows = outcome.superseded;

        // === 步骤 8: 格式化并写回 ===
        debug!("步骤 8: 格式化并写回分区");
        let formatted = mapper.format_partition(&outcome.records);
        entry.final_rows = formatted.len();
        let written = store.write_partitions(&formatted, cols::FK_YEAR_MONTH)?;
        info!(files = written.len(), rows = formatted.len(), "分区写回完成");

        Ok(RunStatus::Success)
    }
}

impl PipelineRunner for TransactionImporter {
    fn pipeline_name(&self) -> &str {
        self.spec.kind.as_str()
    }

    #[instrument(skip(self), fields(dataset = %self.spec.kind))]
    fn run(&self) -> ImportResult<RunLogEntry> {
        info!(dataset = %self.spec.kind, "开始交易数据集更新");
        let mut entry = RunLogEntry::start(self.pipeline_name());

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
