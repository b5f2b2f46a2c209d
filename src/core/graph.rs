use crate::core::operators::OperatorStep;
use crate::types::{SarError, SarResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const PARAMETERS_CLASS: &str = "com.bc.ceres.binding.dom.XppDomElement";

/// Container formats the engine writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "BEAM-DIMAP")]
    BeamDimap,
    #[serde(rename = "GeoTIFF")]
    GeoTiff,
}

impl OutputFormat {
    /// Format name the engine's writer expects
    pub fn engine_name(&self) -> &'static str {
        match self {
            OutputFormat::BeamDimap => "BEAM-DIMAP",
            OutputFormat::GeoTiff => "GeoTIFF",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::BeamDimap => "dim",
            OutputFormat::GeoTiff => "tif",
        }
    }

    /// Output path for an extension-less base such as `outputs/preprocessed_slc`
    pub fn path_for(&self, base: &Path) -> PathBuf {
        let mut path = base.as_os_str().to_owned();
        path.push(".");
        path.push(self.extension());
        PathBuf::from(path)
    }
}

/// A file the graph writes
#[derive(Debug, Clone, PartialEq)]
pub struct WriteTarget {
    pub format: OutputFormat,
    pub path: PathBuf,
}

/// Linear processing graph: Read -> operator chain -> one Write per output
#[derive(Debug, Clone)]
pub struct ProcessingGraph {
    input: PathBuf,
    steps: Vec<OperatorStep>,
    writes: Vec<WriteTarget>,
}

impl ProcessingGraph {
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            steps: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Append an operator fed by the previous one
    pub fn then(mut self, step: OperatorStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Write the last operator's product in the given format
    pub fn write(mut self, format: OutputFormat, base: &Path) -> Self {
        self.writes.push(WriteTarget {
            format,
            path: format.path_for(base),
        });
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn steps(&self) -> &[OperatorStep] {
        &self.steps
    }

    pub fn writes(&self) -> &[WriteTarget] {
        &self.writes
    }

    /// Operator names in execution order, excluding Read/Write
    pub fn operator_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.operator.as_str()).collect()
    }

    /// Serialise as an engine graph document
    pub fn to_xml(&self) -> SarResult<String> {
        if self.writes.is_empty() {
            return Err(SarError::Processing(
                "Processing graph has no output".to_string(),
            ));
        }

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let mut ids = NodeIds::default();

        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        emit(
            &mut writer,
            Event::Start(BytesStart::new("graph").with_attributes([("id", "Graph")])),
        )?;
        text_element(&mut writer, "version", "1.0")?;

        let read_id = ids.next("Read");
        let input = self.input.to_string_lossy();
        write_node(&mut writer, &read_id, "Read", None, &[("file", input.as_ref())])?;

        let mut source = read_id;
        for step in &self.steps {
            let id = ids.next(&step.operator);
            let params: Vec<(&str, String)> = step
                .parameters
                .iter()
                .map(|(k, v)| (k.as_str(), v.to_string()))
                .collect();
            let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
            write_node(&mut writer, &id, &step.operator, Some(&source), &params)?;
            source = id;
        }

        for target in &self.writes {
            let id = ids.next("Write");
            let file = target.path.to_string_lossy();
            write_node(
                &mut writer,
                &id,
                "Write",
                Some(&source),
                &[("file", file.as_ref()), ("formatName", target.format.engine_name())],
            )?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("graph")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| SarError::XmlParsing(format!("Graph is not valid UTF-8: {}", e)))
    }
}

/// Unique node ids: `Write`, `Write(2)`, ...
#[derive(Default)]
struct NodeIds {
    seen: HashMap<String, usize>,
}

impl NodeIds {
    fn next(&mut self, operator: &str) -> String {
        let count = self.seen.entry(operator.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            operator.to_string()
        } else {
            format!("{}({})", operator, count)
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> SarResult<()> {
    writer
        .write_event(event)
        .map_err(|e| SarError::XmlParsing(format!("Failed to write graph XML: {}", e)))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> SarResult<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    id: &str,
    operator: &str,
    source: Option<&str>,
    params: &[(&str, &str)],
) -> SarResult<()> {
    emit(
        writer,
        Event::Start(BytesStart::new("node").with_attributes([("id", id)])),
    )?;
    text_element(writer, "operator", operator)?;

    emit(writer, Event::Start(BytesStart::new("sources")))?;
    if let Some(source) = source {
        emit(
            writer,
            Event::Empty(BytesStart::new("sourceProduct").with_attributes([("refid", source)])),
        )?;
    }
    emit(writer, Event::End(BytesEnd::new("sources")))?;

    let parameters = BytesStart::new("parameters").with_attributes([("class", PARAMETERS_CLASS)]);
    if params.is_empty() {
        emit(writer, Event::Empty(parameters))?;
    } else {
        emit(writer, Event::Start(parameters))?;
        for (key, value) in params {
            text_element(writer, key, value)?;
        }
        emit(writer, Event::End(BytesEnd::new("parameters")))?;
    }

    emit(writer, Event::End(BytesEnd::new("node")))
}
