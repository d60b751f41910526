use std::path::PathBuf;

use thiserror::Error;

/// 项目准备阶段的全部错误类型
#[derive(Error, Debug)]
pub enum ProjectError {
    /// 配置模板无法读取或不是合法 XML
    #[error("cannot load config '{}': {source}", .path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: Box<ProjectError>,
    },
    /// 文档可解析，但缺少工作流需要的元素
    #[error("does not match the workflow schema: {0}")]
    Schema(#[from] quick_xml::DeError),
    #[error("missing <{0}> element in document")]
    MissingElement(String),
    #[error("unsupported database '{0}' (expected kyoto_tycoon or tokyo_cabinet)")]
    UnsupportedDatabase(String),
    #[error("unsupported ktserver type '{0}' (expected memory, snapshot or disk)")]
    UnsupportedKtType(String),
    #[error("working directory '{}' does not exist", .0.display())]
    MissingWorkingDir(PathBuf),
    #[error("seqfile line {line}: {message}")]
    SeqFile { line: usize, message: String },
    #[error("cannot launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed XML attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("malformed XML document: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProjectError>;
