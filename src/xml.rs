//! XML dialect sources and the loader that turns them into navigable trees.
//!
//! The loader only does syntax: names, attributes and element structure.
//! Value parsing, type resolution and layout all happen downstream in the
//! enum and message compilers. No file I/O happens here; callers hand in
//! dialect text together with an optional fallback name.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::CompileError;

/// A named unit of XML input.
#[derive(Debug, Clone)]
pub struct XmlSource {
    /// Caller-supplied name, used when the root lacks a `file` attribute.
    pub name: Option<String>,
    pub xml: String,
}

impl XmlSource {
    pub fn new(name: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            xml: xml.into(),
        }
    }

    pub fn unnamed(xml: impl Into<String>) -> Self {
        Self {
            name: None,
            xml: xml.into(),
        }
    }
}

/// One parsed dialect tree.
#[derive(Debug, Clone, Default)]
pub struct DialectDef {
    /// Effective file name: the root's `file` attribute, else the caller's.
    pub file_name: String,
    pub includes: Vec<String>,
    pub version: Option<u32>,
    pub dialect: Option<u32>,
    pub enums: Vec<EnumDef>,
    pub messages: Vec<MessageDef>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub entries: Vec<EntryDef>,
}

#[derive(Debug, Clone, Default)]
pub struct EntryDef {
    pub name: String,
    /// Raw `value=` text; the enum compiler parses it.
    pub value: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageDef {
    /// Raw `id=` text; the message compiler parses it.
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldDef {
    pub name: String,
    /// Raw `type=` text including any array suffix.
    pub type_text: String,
    pub enum_group: Option<String>,
    pub is_extension: bool,
}

/// Parse every source, then verify the include closure: each `<include>`
/// target must match some loaded source's effective file name. Includes are
/// never expanded transitively; dialects compile independently and merge
/// downstream.
pub fn load_sources(sources: &[XmlSource]) -> Result<Vec<DialectDef>, CompileError> {
    let defs = sources
        .iter()
        .map(parse_source)
        .collect::<Result<Vec<_>, _>>()?;

    for def in &defs {
        for include in &def.includes {
            if !defs.iter().any(|d| d.file_name == *include) {
                return Err(CompileError::MissingInclude {
                    include: include.clone(),
                    file: def.file_name.clone(),
                });
            }
        }
    }

    Ok(defs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XmlElement {
    Mavlink,
    Version,
    Dialect,
    Include,
    Enums,
    Enum,
    Entry,
    Description,
    Messages,
    Message,
    Field,
    Extensions,
}

const fn identify(name: &[u8]) -> Option<XmlElement> {
    use self::XmlElement::*;
    match name {
        b"mavlink" => Some(Mavlink),
        b"version" => Some(Version),
        b"dialect" => Some(Dialect),
        b"include" => Some(Include),
        b"enums" => Some(Enums),
        b"enum" => Some(Enum),
        b"entry" => Some(Entry),
        b"description" => Some(Description),
        b"messages" => Some(Messages),
        b"message" => Some(Message),
        b"field" => Some(Field),
        b"extensions" => Some(Extensions),
        _ => None,
    }
}

fn is_valid_parent(parent: Option<XmlElement>, el: XmlElement) -> bool {
    use self::XmlElement::*;
    match el {
        Mavlink => parent.is_none(),
        Version | Dialect | Include | Enums | Messages => parent == Some(Mavlink),
        Enum => parent == Some(Enums),
        Entry => parent == Some(Enum),
        Description => matches!(parent, Some(Enum | Entry | Message)),
        Message => parent == Some(Messages),
        Field | Extensions => parent == Some(Message),
    }
}

fn named(
    attr: Option<String>,
    element: &'static str,
    file: &str,
) -> Result<String, CompileError> {
    attr.ok_or_else(|| CompileError::NullIdentifier {
        element,
        attribute: "name",
        file: file.to_string(),
    })
}

fn append(text: &mut Option<String>, s: &str) {
    match text {
        Some(t) => t.push_str(s),
        None => *text = Some(s.to_string()),
    }
}

fn as_description(text: Option<String>) -> Option<String> {
    text.map(|t| t.replace('\n', " "))
}

fn parse_source(source: &XmlSource) -> Result<DialectDef, CompileError> {
    let mut def = DialectDef::default();
    let mut file = source.name.clone().unwrap_or_default();
    let mut has_identity = source.name.is_some();

    let mut reader = Reader::from_str(&source.xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<XmlElement> = Vec::new();
    // depth inside an element the grammar does not know; its whole subtree
    // (wip, deprecated, param, anything future) is skipped
    let mut skip_depth = 0usize;
    let mut text: Option<String> = None;
    let mut in_extensions = false;

    let mut enm = EnumDef::default();
    let mut entry = EntryDef::default();
    let mut message = MessageDef::default();
    let mut field = FieldDef::default();

    loop {
        let event = reader.read_event().map_err(|err| CompileError::InvalidXml {
            err,
            file: file.clone(),
        })?;
        match event {
            Event::Eof => break,
            Event::Start(bytes) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                let el = match identify(bytes.name().into_inner()) {
                    Some(el) if is_valid_parent(stack.last().copied(), el) => el,
                    _ => {
                        skip_depth = 1;
                        continue;
                    }
                };

                let mut name_attr = None;
                let mut value_attr = None;
                let mut id_attr = None;
                let mut type_attr = None;
                let mut enum_attr = None;
                let mut file_attr = None;
                for attr in bytes.attributes() {
                    let attr = attr.map_err(|err| CompileError::InvalidXml {
                        err: err.into(),
                        file: file.clone(),
                    })?;
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.into_inner() {
                        b"name" => name_attr = Some(value),
                        b"value" => value_attr = Some(value),
                        b"id" => id_attr = Some(value),
                        b"type" => type_attr = Some(value),
                        b"enum" => enum_attr = Some(value),
                        b"file" => file_attr = Some(value),
                        _ => (),
                    }
                }

                match el {
                    XmlElement::Mavlink => {
                        if let Some(name) = file_attr {
                            file = name;
                            has_identity = true;
                        }
                        if !has_identity {
                            return Err(CompileError::MissingFileIdentity);
                        }
                        def.file_name = file.clone();
                    }
                    XmlElement::Enum => {
                        enm = EnumDef {
                            name: named(name_attr, "enum", &file)?,
                            ..Default::default()
                        };
                    }
                    XmlElement::Entry => {
                        entry = EntryDef {
                            name: named(name_attr, "entry", &file)?,
                            value: value_attr,
                            ..Default::default()
                        };
                    }
                    XmlElement::Message => {
                        in_extensions = false;
                        message = MessageDef {
                            id: id_attr.unwrap_or_default(),
                            name: named(name_attr, "message", &file)?,
                            ..Default::default()
                        };
                    }
                    XmlElement::Field => {
                        field = FieldDef {
                            name: named(name_attr, "field", &file)?,
                            type_text: type_attr.unwrap_or_default(),
                            enum_group: enum_attr,
                            is_extension: in_extensions,
                        };
                    }
                    XmlElement::Extensions => in_extensions = true,
                    _ => (),
                }
                stack.push(el);
            }
            Event::End(_) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                let Some(el) = stack.pop() else { continue };
                match el {
                    XmlElement::Include => {
                        if let Some(t) = text.take() {
                            def.includes.push(t.trim().to_string());
                        }
                    }
                    XmlElement::Version => {
                        def.version = text.take().and_then(|t| t.trim().parse().ok());
                    }
                    XmlElement::Dialect => {
                        def.dialect = text.take().and_then(|t| t.trim().parse().ok());
                    }
                    XmlElement::Description => match stack.last() {
                        Some(XmlElement::Enum) => enm.description = as_description(text.take()),
                        Some(XmlElement::Entry) => entry.description = as_description(text.take()),
                        Some(XmlElement::Message) => {
                            message.description = as_description(text.take());
                        }
                        _ => (),
                    },
                    XmlElement::Entry => enm.entries.push(std::mem::take(&mut entry)),
                    XmlElement::Enum => def.enums.push(std::mem::take(&mut enm)),
                    XmlElement::Field => message.fields.push(std::mem::take(&mut field)),
                    XmlElement::Message => {
                        in_extensions = false;
                        def.messages.push(std::mem::take(&mut message));
                    }
                    _ => (),
                }
                text = None;
            }
            Event::Text(bytes) => {
                if skip_depth > 0 {
                    continue;
                }
                append(&mut text, &String::from_utf8_lossy(&bytes));
            }
            Event::GeneralRef(bytes) => {
                if skip_depth > 0 {
                    continue;
                }
                let entity = String::from_utf8_lossy(&bytes);
                match entity.as_ref() {
                    "amp" => append(&mut text, "&"),
                    "lt" => append(&mut text, "<"),
                    "gt" => append(&mut text, ">"),
                    "apos" => append(&mut text, "'"),
                    "quot" => append(&mut text, "\""),
                    other => append(&mut text, &format!("&{other};")),
                }
            }
            _ => (),
        }
    }

    if def.file_name.is_empty() {
        // the document never opened a <mavlink> root
        if !has_identity {
            return Err(CompileError::MissingFileIdentity);
        }
        def.file_name = file;
    }

    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_attribute_wins_over_caller_name() {
        let source = XmlSource::new("local.xml", r#"<mavlink file="common.xml"/>"#);
        let def = parse_source(&source).unwrap();
        assert_eq!(def.file_name, "common.xml");
    }

    #[test]
    fn nameless_source_is_rejected() {
        let source = XmlSource::unnamed("<mavlink/>");
        assert!(matches!(
            parse_source(&source),
            Err(CompileError::MissingFileIdentity)
        ));
    }

    #[test]
    fn unknown_subtrees_are_skipped() {
        let source = XmlSource::new(
            "a.xml",
            r#"<mavlink>
                 <enums>
                   <enum name="E">
                     <entry name="X" value="1">
                       <wip/>
                       <param index="1">ignored</param>
                     </entry>
                   </enum>
                 </enums>
               </mavlink>"#,
        );
        let def = parse_source(&source).unwrap();
        assert_eq!(def.enums.len(), 1);
        assert_eq!(def.enums[0].entries[0].name, "X");
        assert_eq!(def.enums[0].entries[0].description, None);
    }

    #[test]
    fn extension_marker_partitions_fields() {
        let source = XmlSource::new(
            "a.xml",
            r#"<mavlink>
                 <messages>
                   <message id="7" name="M">
                     <field name="a" type="uint8_t"/>
                     <extensions/>
                     <field name="b" type="uint16_t"/>
                   </message>
                 </messages>
               </mavlink>"#,
        );
        let def = parse_source(&source).unwrap();
        let fields = &def.messages[0].fields;
        assert!(!fields[0].is_extension);
        assert!(fields[1].is_extension);
    }

    #[test]
    fn includes_and_numbers_are_collected() {
        let source = XmlSource::new(
            "a.xml",
            r#"<mavlink>
                 <include>common.xml</include>
                 <version>3</version>
                 <dialect>8</dialect>
               </mavlink>"#,
        );
        let def = parse_source(&source).unwrap();
        assert_eq!(def.includes, vec!["common.xml"]);
        assert_eq!(def.version, Some(3));
        assert_eq!(def.dialect, Some(8));
    }
}
