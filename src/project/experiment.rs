//! 实验描述文档：输入序列描述 + 键值数据库连接参数。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ProjectError, Result};
use crate::io::xml::{bool_attr, parse_bool_attr, XmlElement};

pub const CACTUS_DISK_ELEM: &str = "cactus_disk";
pub const DB_CONF_ELEM: &str = "st_kv_database_conf";

/// 下游流水线支持的两种键值存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Database {
    #[value(name = "kyoto_tycoon")]
    KyotoTycoon,
    #[value(name = "tokyo_cabinet")]
    TokyoCabinet,
}

impl Database {
    pub fn as_str(self) -> &'static str {
        match self {
            Database::KyotoTycoon => "kyoto_tycoon",
            Database::TokyoCabinet => "tokyo_cabinet",
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Database {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kyoto_tycoon" => Ok(Database::KyotoTycoon),
            "tokyo_cabinet" => Ok(Database::TokyoCabinet),
            other => Err(ProjectError::UnsupportedDatabase(other.to_string())),
        }
    }
}

/// ktserver 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KtType {
    Memory,
    Snapshot,
    Disk,
}

impl KtType {
    pub fn as_str(self) -> &'static str {
        match self {
            KtType::Memory => "memory",
            KtType::Snapshot => "snapshot",
            KtType::Disk => "disk",
        }
    }

    pub fn in_memory(self) -> bool {
        matches!(self, KtType::Memory | KtType::Snapshot)
    }

    pub fn snapshot(self) -> bool {
        self == KtType::Snapshot
    }
}

impl fmt::Display for KtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KtType {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(KtType::Memory),
            "snapshot" => Ok(KtType::Snapshot),
            "disk" => Ok(KtType::Disk),
            other => Err(ProjectError::UnsupportedKtType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentDocument {
    root: XmlElement,
    database: Database,
}

impl ExperimentDocument {
    /// 在描述元素下追加 `cactus_disk/st_kv_database_conf/<db>` 子树。
    pub fn new(mut root: XmlElement, database: Database) -> Self {
        let disk = root.push_child(XmlElement::new(CACTUS_DISK_ELEM));
        let conf = disk.push_child(XmlElement::new(DB_CONF_ELEM));
        conf.set_attr("type", database.as_str());
        conf.push_child(XmlElement::new(database.as_str()));
        Self { root, database }
    }

    /// 包装已组装好的实验树（例如从磁盘读回的 expTemplate.xml）
    pub fn from_element(root: XmlElement) -> Result<Self> {
        let path = format!("{}/{}", CACTUS_DISK_ELEM, DB_CONF_ELEM);
        let conf = root
            .find(&path)
            .ok_or_else(|| ProjectError::MissingElement(path.clone()))?;
        let type_attr = conf
            .attr("type")
            .ok_or_else(|| ProjectError::MissingElement(format!("{}[@type]", path)))?;
        let database = type_attr.parse()?;
        Ok(Self { root, database })
    }

    pub fn read_file(path: &Path) -> Result<Self> {
        Self::from_element(XmlElement::read_file(path)?)
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn database(&self) -> Database {
        self.database
    }

    pub fn config_path(&self) -> Option<&str> {
        self.root.attr("config")
    }

    pub fn set_config_path(&mut self, path: &Path) {
        self.root.set_attr("config", path.to_string_lossy());
    }

    pub fn db_host(&self) -> Option<&str> {
        self.db_elem()?.attr("host")
    }

    pub fn set_db_host(&mut self, host: &str) -> Result<()> {
        self.db_elem_mut()?.set_attr("host", host);
        Ok(())
    }

    pub fn db_port(&self) -> Option<u16> {
        self.db_elem()?.attr("port")?.trim().parse().ok()
    }

    pub fn set_db_port(&mut self, port: u16) -> Result<()> {
        self.db_elem_mut()?.set_attr("port", port.to_string());
        Ok(())
    }

    pub fn db_in_memory(&self) -> Option<bool> {
        parse_bool_attr(self.db_elem()?.attr("in_memory")?)
    }

    pub fn set_db_in_memory(&mut self, in_memory: bool) -> Result<()> {
        self.db_elem_mut()?.set_attr("in_memory", bool_attr(in_memory));
        Ok(())
    }

    pub fn db_snapshot(&self) -> Option<bool> {
        parse_bool_attr(self.db_elem()?.attr("snapshot")?)
    }

    pub fn set_db_snapshot(&mut self, snapshot: bool) -> Result<()> {
        self.db_elem_mut()?.set_attr("snapshot", bool_attr(snapshot));
        Ok(())
    }

    pub fn db_server_options(&self) -> Option<&str> {
        self.db_elem()?.attr("server_options")
    }

    /// 下游的数据库配置解析按空白切分，含空格的选项无法原样传递。
    pub fn set_db_server_options(&mut self, options: &str) -> Result<()> {
        self.db_elem_mut()?.set_attr("server_options", options);
        Ok(())
    }

    pub fn db_create_tuning_options(&self) -> Option<&str> {
        self.db_elem()?.attr("tuning_options")
    }

    pub fn set_db_create_tuning_options(&mut self, options: &str) -> Result<()> {
        self.db_elem_mut()?.set_attr("tuning_options", options);
        Ok(())
    }

    pub fn db_read_tuning_options(&self) -> Option<&str> {
        self.db_elem()?.attr("read_tuning_options")
    }

    pub fn set_db_read_tuning_options(&mut self, options: &str) -> Result<()> {
        self.db_elem_mut()?.set_attr("read_tuning_options", options);
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        self.root.write_file(path)
    }

    fn db_elem(&self) -> Option<&XmlElement> {
        self.root.find(&self.db_path())
    }

    fn db_elem_mut(&mut self) -> Result<&mut XmlElement> {
        let path = self.db_path();
        self.root
            .find_mut(&path)
            .ok_or(ProjectError::MissingElement(path))
    }

    fn db_path(&self) -> String {
        format!("{}/{}/{}", CACTUS_DISK_ELEM, DB_CONF_ELEM, self.database.as_str())
    }
}
