//! 通用的内存 XML 元素树。
//!
//! 工作流配置和实验描述都由下游工具定义格式，这里只保证：
//! - 解析后保留全部元素与属性（包括本层不认识的调参项）；
//! - 混合内容按 ElementTree 的方式保存：元素自身的 `text` 加上每个子元素之后的 `tail`；
//! - 根元素之外出现非空白文本视为格式错误；
//! - 属性按插入顺序输出，重复设置会原地覆盖，因此同样的输入总是得到同样的文件；
//! - 输出带 XML 声明，两空格缩进。

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{ProjectError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
    tail: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
            tail: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 紧跟在本元素结束标签之后、下一个兄弟之前的文本
    pub fn tail(&self) -> &str {
        &self.tail
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(idx).1)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// 按 `a/b/c` 路径逐级查找第一个同名子元素
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |cur, seg| cur.child(seg))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut XmlElement> {
        let mut cur = self;
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            cur = cur.child_mut(seg)?;
        }
        Some(cur)
    }

    /// 追加子元素并返回其可变引用（对应 ElementTree 的 SubElement）
    pub fn push_child(&mut self, child: XmlElement) -> &mut XmlElement {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn parse_str(input: &str) -> Result<Self> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(Self::from_start(&e)?),
                Event::Empty(e) => {
                    let elem = Self::from_start(&e)?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Event::End(_) => {
                    // the reader already checks end names
                    if let Some(elem) = stack.pop() {
                        attach(&mut stack, &mut root, elem)?;
                    }
                }
                Event::Text(t) => push_text(&mut stack, &t.unescape()?)?,
                Event::CData(c) => push_text(&mut stack, &String::from_utf8_lossy(&c))?,
                Event::Eof => break,
                // declarations, comments, PIs and doctypes are not kept
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ProjectError::Malformed(format!("unclosed element <{}>", open.name)));
        }
        root.ok_or_else(|| ProjectError::Malformed("no root element".to_string()))
    }

    pub fn read_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_into(&mut writer)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }

    fn from_start(e: &BytesStart<'_>) -> Result<Self> {
        let mut elem = Self::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            elem.attributes.push((key, value));
        }
        Ok(elem)
    }

    fn write_into<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
            if !child.tail.is_empty() {
                writer.write_event(Event::Text(BytesText::new(&child.tail)))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// 下游工具约定布尔属性写成 "1" / "0"
pub fn bool_attr(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

pub fn parse_bool_attr(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "True" => Some(true),
        "0" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    let Some(cur) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(ProjectError::Malformed(format!(
            "text outside the root element: {:?}",
            text.trim()
        )));
    };
    match cur.children.last_mut() {
        Some(prev) => prev.tail.push_str(text),
        None => cur.text.push_str(text),
    }
    Ok(())
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, elem: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(elem),
        None if root.is_none() => *root = Some(elem),
        None => {
            return Err(ProjectError::Malformed(format!(
                "second root element <{}>",
                elem.name
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_with_attributes() {
        let xml = r#"<?xml version="1.0"?>
<!-- workflow -->
<root a="1" b="x &amp; y">
  <hal buildHal="0"/>
  <multi_cactus><decomposition subtree_size="2"/></multi_cactus>
  <note>hello</note>
</root>"#;
        let root = XmlElement::parse_str(xml).unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.attr("a"), Some("1"));
        assert_eq!(root.attr("b"), Some("x & y"));
        assert_eq!(root.children().len(), 3);
        assert_eq!(root.find("hal").and_then(|h| h.attr("buildHal")), Some("0"));
        assert_eq!(
            root.find("multi_cactus/decomposition").and_then(|d| d.attr("subtree_size")),
            Some("2")
        );
        assert_eq!(root.find("note").map(XmlElement::text), Some("hello"));
        assert!(root.find("multi_cactus/missing").is_none());
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut e = XmlElement::new("x");
        e.set_attr("first", "1");
        e.set_attr("second", "2");
        e.set_attr("first", "3");
        let attrs: Vec<_> = e.attributes().collect();
        assert_eq!(attrs, vec![("first", "3"), ("second", "2")]);
        assert_eq!(e.remove_attr("first").as_deref(), Some("3"));
        assert_eq!(e.attr("first"), None);
    }

    #[test]
    fn write_then_parse_keeps_tree() {
        let mut root = XmlElement::new("cactus_workflow_experiment");
        root.set_attr("sequences", "/a/b.fa /c/d.fa");
        let disk = root.push_child(XmlElement::new("cactus_disk"));
        let conf = disk.push_child(XmlElement::new("st_kv_database_conf"));
        conf.set_attr("type", "tokyo_cabinet");
        conf.push_child(XmlElement::new("tokyo_cabinet"));

        let text = root.to_xml_string().unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<tokyo_cabinet/>"));
        assert_eq!(XmlElement::parse_str(&text).unwrap(), root);
    }

    #[test]
    fn escapes_attribute_values() {
        let mut e = XmlElement::new("db");
        e.set_attr("tuning_options", "#opts=ls#bnum=<30m>");
        let text = e.to_xml_string().unwrap();
        assert!(text.contains("&lt;30m&gt;"));
        let back = XmlElement::parse_str(&text).unwrap();
        assert_eq!(back.attr("tuning_options"), Some("#opts=ls#bnum=<30m>"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(XmlElement::parse_str("").is_err());
        assert!(XmlElement::parse_str("<a><b></a>").is_err());
        assert!(XmlElement::parse_str("<a>").is_err());
        assert!(XmlElement::parse_str("<a/><b/>").is_err());
        assert!(XmlElement::parse_str("not xml at all").is_err());
    }

    #[test]
    fn rejects_text_outside_root() {
        for input in ["<a/>junk", "junk<a/>", "<a><b/></a> trailing garbage", "<a/><![CDATA[x]]>"] {
            assert!(
                matches!(XmlElement::parse_str(input), Err(ProjectError::Malformed(_))),
                "{input}"
            );
        }
        // surrounding whitespace and comments are fine
        assert!(XmlElement::parse_str("\n  <!-- c -->\n<a/>\n\n").is_ok());
    }

    #[test]
    fn mixed_content_keeps_text_positions() {
        let root = XmlElement::parse_str("<cfg>pre<multi_cactus/>post<hal/></cfg>").unwrap();
        assert_eq!(root.text(), "pre");
        assert_eq!(root.child("multi_cactus").map(XmlElement::tail), Some("post"));
        assert_eq!(root.child("hal").map(XmlElement::tail), Some(""));

        let text = root.to_xml_string().unwrap();
        let back = XmlElement::parse_str(&text).unwrap();
        assert_eq!(back, root);
        assert!(text.find("pre").unwrap() < text.find("<multi_cactus").unwrap());
        assert!(text.find("post").unwrap() > text.find("<multi_cactus").unwrap());
        assert!(text.find("post").unwrap() < text.find("<hal").unwrap());
    }
}
