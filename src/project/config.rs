//! 工作流配置文档。
//!
//! 加载时先用 serde 校验配置具备本层要改写的元素（`hal`、
//! `multi_cactus/decomposition`），其余调参项原样保留在通用元素树里。

use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::error::{ProjectError, Result};
use crate::io::xml::{bool_attr, parse_bool_attr, XmlElement};

/// 默认模板相对 cactus 安装根目录的位置
pub const DEFAULT_CONFIG_RELATIVE_PATH: &str = "progressive/cactus_progressive_workflow_config.xml";

const HAL_ELEM: &str = "hal";
const DECOMPOSITION_PATH: &str = "multi_cactus/decomposition";

pub fn default_config_path(cactus_root: &Path) -> PathBuf {
    cactus_root.join(DEFAULT_CONFIG_RELATIVE_PATH)
}

#[derive(Debug, Deserialize)]
struct WorkflowSchema {
    #[serde(rename = "hal")]
    _hal: IgnoredAny,
    #[serde(rename = "multi_cactus")]
    _multi_cactus: MultiCactusSchema,
}

#[derive(Debug, Deserialize)]
struct MultiCactusSchema {
    #[serde(rename = "decomposition")]
    _decomposition: IgnoredAny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    root: XmlElement,
}

impl ConfigDocument {
    pub fn load(path: &Path) -> Result<Self> {
        std::fs::read_to_string(path)
            .map_err(ProjectError::from)
            .and_then(|text| Self::parse(&text))
            .map_err(|source| ProjectError::ConfigLoad {
                path: path.to_path_buf(),
                source: Box::new(source),
            })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let root = XmlElement::parse_str(text)?;
        let _: WorkflowSchema = quick_xml::de::from_str(text)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn build_hal(&self) -> Option<bool> {
        self.hal_flag("buildHal")
    }

    pub fn set_build_hal(&mut self, on: bool) -> Result<()> {
        self.set_hal_flag("buildHal", on)
    }

    pub fn build_fasta(&self) -> Option<bool> {
        self.hal_flag("buildFasta")
    }

    pub fn set_build_fasta(&mut self, on: bool) -> Result<()> {
        self.set_hal_flag("buildFasta", on)
    }

    pub fn build_maf(&self) -> Option<bool> {
        self.hal_flag("buildMaf")
    }

    pub fn set_build_maf(&mut self, on: bool) -> Result<()> {
        self.set_hal_flag("buildMaf", on)
    }

    pub fn join_maf(&self) -> Option<bool> {
        self.hal_flag("joinMaf")
    }

    pub fn set_join_maf(&mut self, on: bool) -> Result<()> {
        self.set_hal_flag("joinMaf", on)
    }

    pub fn subtree_size(&self) -> Option<i64> {
        self.root
            .find(DECOMPOSITION_PATH)?
            .attr("subtree_size")?
            .trim()
            .parse()
            .ok()
    }

    pub fn set_subtree_size(&mut self, size: i64) -> Result<()> {
        element_mut(&mut self.root, DECOMPOSITION_PATH)?.set_attr("subtree_size", size.to_string());
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        self.root.write_file(path)
    }

    fn hal_flag(&self, key: &str) -> Option<bool> {
        parse_bool_attr(self.root.find(HAL_ELEM)?.attr(key)?)
    }

    fn set_hal_flag(&mut self, key: &str, on: bool) -> Result<()> {
        element_mut(&mut self.root, HAL_ELEM)?.set_attr(key, bool_attr(on));
        Ok(())
    }
}

fn element_mut<'a>(root: &'a mut XmlElement, path: &str) -> Result<&'a mut XmlElement> {
    root.find_mut(path)
        .ok_or_else(|| ProjectError::MissingElement(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<cactus_workflow_config>
  <constants defaultMemory="2147483648"/>
  <multi_cactus>
    <outgroup strategy="greedyLeaves" threshold="0"/>
    <decomposition subtree_size="2" self_alignment="false"/>
  </multi_cactus>
  <hal buildHal="0" buildFasta="0" buildMaf="0" joinMaf="0"/>
</cactus_workflow_config>"#;

    #[test]
    fn reads_and_sets_flags() {
        let mut cfg = ConfigDocument::parse(TEMPLATE).unwrap();
        assert_eq!(cfg.build_hal(), Some(false));
        assert_eq!(cfg.subtree_size(), Some(2));

        cfg.set_build_hal(true).unwrap();
        cfg.set_join_maf(true).unwrap();
        cfg.set_subtree_size(i64::MAX).unwrap();

        assert_eq!(cfg.build_hal(), Some(true));
        assert_eq!(cfg.build_fasta(), Some(false));
        assert_eq!(cfg.join_maf(), Some(true));
        assert_eq!(cfg.subtree_size(), Some(i64::MAX));

        let hal = cfg.root().find("hal").unwrap();
        assert_eq!(hal.attr("buildHal"), Some("1"));
        // untouched knobs survive
        let decomp = cfg.root().find("multi_cactus/decomposition").unwrap();
        assert_eq!(decomp.attr("self_alignment"), Some("false"));
        assert!(cfg.root().find("constants").is_some());
    }

    #[test]
    fn schema_requires_hal_and_decomposition() {
        let no_hal = "<cactus_workflow_config><multi_cactus><decomposition/></multi_cactus></cactus_workflow_config>";
        assert!(matches!(ConfigDocument::parse(no_hal), Err(ProjectError::Schema(_))));

        let no_decomp = "<cactus_workflow_config><hal/><multi_cactus/></cactus_workflow_config>";
        assert!(matches!(ConfigDocument::parse(no_decomp), Err(ProjectError::Schema(_))));
    }

    #[test]
    fn load_wraps_failures_with_path() {
        let missing = Path::new("/nonexistent/cactus/config.xml");
        match ConfigDocument::load(missing) {
            Err(ProjectError::ConfigLoad { path, source }) => {
                assert_eq!(path, missing);
                assert!(matches!(*source, ProjectError::Io(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn default_path_under_cactus_root() {
        assert_eq!(
            default_config_path(Path::new("/opt/cactus")),
            PathBuf::from("/opt/cactus/progressive/cactus_progressive_workflow_config.xml")
        );
    }
}
