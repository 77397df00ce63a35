// ==========================================
// 增量对账引擎 - 导入层
// ==========================================
// 职责: 外部抽取文件与参考表读取、标准化、主键派生，以及各条管道的编排
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod conflict_handler;
pub mod country_resolver;
pub mod customer_importer;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod key_builder;
pub mod product_review_importer;
pub mod reference_loader;
pub mod run_recorder;
pub mod transaction_importer;

// 重导出核心类型
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use country_resolver::CountryResolver;
pub use customer_importer::CustomerImporter;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::TransactionFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use key_builder::KeyBuilder;
pub use product_review_importer::{ProductReviewImporter, ReviewOperation};
pub use run_recorder::RunRecorder;
pub use transaction_importer::TransactionImporter;

// 重导出 Trait 接口
pub use importer_trait::{ConflictHandler, DataCleaner, FileParser, PipelineRunner};
