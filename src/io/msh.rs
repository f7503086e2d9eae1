//! Gmsh MSH 2.2 ASCII files.
//!
//! Only the sections `$MeshFormat`, `$PhysicalNames`, `$Nodes` and `$Elements` are interpreted,
//! all other sections are skipped. Node ids must be exactly `1..=n` (in any order) and node `id` is
//! stored at index `id - 1`.
use crate::element::gmsh_element_info;
use crate::mesh::{ParsedMesh, PhysicalGroup, RawElement};
use crate::{Error, Result};
use eyre::WrapErr;
use log::{debug, info};
use nalgebra::Point3;
use rustc_hash::FxHashMap;
use std::fmt::{Display, Write};
use std::path::Path;
use std::str::FromStr;

/// The only supported MSH format version.
pub const MSH_VERSION: &str = "2.2";

/// Loads a [`ParsedMesh`] from a Gmsh MSH 2.2 ASCII file at the given path.
pub fn load_msh_from_file<P: AsRef<Path>>(file_path: P) -> eyre::Result<ParsedMesh> {
    let file_path = file_path.as_ref();
    let msh_bytes = std::fs::read(file_path).wrap_err_with(|| format!("failed to read file {}", file_path.display()))?;
    let mesh = parse_msh_bytes(&msh_bytes).wrap_err("failed to load mesh from msh file")?;
    info!("loaded mesh from {}", file_path.display());
    Ok(mesh)
}

/// Parses the given bytes as a Gmsh MSH 2.2 ASCII file.
pub fn parse_msh_bytes(bytes: &[u8]) -> Result<ParsedMesh> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::MeshFormat("file is not valid UTF-8 (binary MSH files are not supported)".to_string()))?;
    parse_msh_str(text)
}

/// Parses the given text as a Gmsh MSH 2.2 ASCII file.
pub fn parse_msh_str(text: &str) -> Result<ParsedMesh> {
    let mut reader = LineReader::new(text);
    let mut format_seen = false;
    let mut groups = None;
    let mut nodes = None;
    let mut elements = None;

    while let Some((line_number, line)) = reader.next_line() {
        let section = line
            .strip_prefix('$')
            .ok_or_else(|| format_error(line_number, format!("expected section header, found '{}'", line)))?;
        match section {
            "MeshFormat" => {
                parse_mesh_format(&mut reader)?;
                format_seen = true;
            }
            "PhysicalNames" => groups = Some(parse_physical_names(&mut reader)?),
            "Nodes" => nodes = Some(parse_nodes(&mut reader)?),
            "Elements" => elements = Some(parse_elements(&mut reader)?),
            other => {
                debug!("skipping unsupported MSH section ${}", other);
                reader.skip_section(other)?;
                continue;
            }
        }
        reader.expect_section_end(section)?;
    }

    if !format_seen {
        return Err(Error::MeshFormat("missing $MeshFormat section".to_string()));
    }
    let groups = groups.ok_or_else(|| Error::MeshFormat("missing $PhysicalNames section".to_string()))?;
    let vertices = nodes.ok_or_else(|| Error::MeshFormat("missing $Nodes section".to_string()))?;
    let elements = elements.ok_or_else(|| Error::MeshFormat("missing $Elements section".to_string()))?;

    let elements = elements
        .into_iter()
        .map(|element| {
            let nodes = element
                .node_ids
                .iter()
                .map(|&id| {
                    if (1..=vertices.len()).contains(&id) {
                        Ok(id - 1)
                    } else {
                        Err(format_error(
                            element.line_number,
                            format!("element references undeclared node id {}", id),
                        ))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RawElement {
                gmsh_type: element.gmsh_type,
                physical_tag: element.physical_tag,
                nodes,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    ParsedMesh::from_physical_groups(vertices, &groups, elements)
}

/// Encodes a mesh as a Gmsh MSH 2.2 ASCII file.
///
/// Every element is written with two tags, the physical tag repeated as the geometrical tag.
/// Boundary elements are written before domain elements.
pub fn write_msh(mesh: &ParsedMesh) -> String {
    let mut out = String::new();
    write_msh_to(&mut out, mesh).expect("writing to a String is infallible");
    out
}

fn write_msh_to(out: &mut String, mesh: &ParsedMesh) -> std::fmt::Result {
    writeln!(out, "$MeshFormat")?;
    writeln!(out, "{} 0 8", MSH_VERSION)?;
    writeln!(out, "$EndMeshFormat")?;

    let groups = mesh.physical_groups();
    writeln!(out, "$PhysicalNames")?;
    writeln!(out, "{}", groups.len())?;
    for group in &groups {
        writeln!(out, "{} {} \"{}\"", group.dim, group.tag, group.name)?;
    }
    writeln!(out, "$EndPhysicalNames")?;

    writeln!(out, "$Nodes")?;
    writeln!(out, "{}", mesh.vertices().len())?;
    for (i, v) in mesh.vertices().iter().enumerate() {
        writeln!(out, "{} {} {} {}", i + 1, v.x, v.y, v.z)?;
    }
    writeln!(out, "$EndNodes")?;

    let blocks: Vec<_> = [mesh.boundary_connectivity(), mesh.domain_connectivity()]
        .into_iter()
        .flat_map(|connectivity| connectivity.iter())
        .flat_map(|(&tag, group)| group.iter().map(move |(&gmsh_type, block)| (tag, gmsh_type, block)))
        .collect();
    let num_elements: usize = blocks.iter().map(|(_, _, block)| block.num_elements()).sum();

    writeln!(out, "$Elements")?;
    writeln!(out, "{}", num_elements)?;
    let mut element_id = 1;
    for (tag, gmsh_type, block) in blocks {
        for row in block.rows() {
            write!(out, "{} {} 2 {} {}", element_id, gmsh_type, tag, tag)?;
            for node in row {
                write!(out, " {}", node + 1)?;
            }
            writeln!(out)?;
            element_id += 1;
        }
    }
    writeln!(out, "$EndElements")?;
    Ok(())
}

struct ElementRecord {
    line_number: usize,
    gmsh_type: usize,
    physical_tag: usize,
    node_ids: Vec<usize>,
}

/// Iterates over non-empty, trimmed lines together with their 1-based line numbers.
struct LineReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    last_line_number: usize,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            last_line_number: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        for (i, line) in self.lines.by_ref() {
            self.last_line_number = i + 1;
            let line = line.trim();
            if !line.is_empty() {
                return Some((i + 1, line));
            }
        }
        None
    }

    fn require_line(&mut self, section: &str) -> Result<(usize, &'a str)> {
        self.next_line().ok_or_else(|| {
            format_error(
                self.last_line_number,
                format!("unexpected end of file in section ${}", section),
            )
        })
    }

    fn expect_section_end(&mut self, section: &str) -> Result<()> {
        let (line_number, line) = self.require_line(section)?;
        if line.strip_prefix("$End") == Some(section) {
            Ok(())
        } else {
            Err(format_error(
                line_number,
                format!("expected $End{}, found '{}'", section, line),
            ))
        }
    }

    fn skip_section(&mut self, section: &str) -> Result<()> {
        loop {
            let (_, line) = self.require_line(section)?;
            if line.strip_prefix("$End") == Some(section) {
                return Ok(());
            }
        }
    }

    /// Reads a line holding a single count.
    fn read_count(&mut self, section: &str) -> Result<usize> {
        let (line_number, line) = self.require_line(section)?;
        parse_token(line, line_number)
    }
}

fn format_error(line_number: usize, msg: impl Display) -> Error {
    Error::MeshFormat(format!("line {}: {}", line_number, msg))
}

fn parse_token<N: FromStr>(token: &str, line_number: usize) -> Result<N> {
    token
        .parse()
        .map_err(|_| format_error(line_number, format!("malformed number '{}'", token)))
}

/// Splits off the first whitespace-separated token.
fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((token, rest)) => Some((token, rest.trim_start())),
        None => Some((s, "")),
    }
}

fn parse_mesh_format(reader: &mut LineReader) -> Result<()> {
    let (line_number, line) = reader.require_line("MeshFormat")?;
    let tokens: Vec<_> = line.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(format_error(
            line_number,
            "expected '<version> <file-type> <data-size>'",
        ));
    }
    if tokens[0] != MSH_VERSION {
        return Err(format_error(
            line_number,
            format!("unsupported MSH version {} (only {} is supported)", tokens[0], MSH_VERSION),
        ));
    }
    let file_type: usize = parse_token(tokens[1], line_number)?;
    if file_type != 0 {
        return Err(format_error(line_number, "binary MSH files are not supported"));
    }
    let _data_size: usize = parse_token(tokens[2], line_number)?;
    Ok(())
}

fn parse_physical_names(reader: &mut LineReader) -> Result<Vec<PhysicalGroup>> {
    let count = reader.read_count("PhysicalNames")?;
    let mut groups = Vec::with_capacity(count);
    for _ in 0..count {
        let (line_number, line) = reader.require_line("PhysicalNames")?;
        let missing = || format_error(line_number, "expected '<dim> <tag> \"<name>\"'");
        let (dim, rest) = split_token(line).ok_or_else(missing)?;
        let (tag, rest) = split_token(rest).ok_or_else(missing)?;
        let name = rest.trim();
        let name = name
            .strip_prefix('"')
            .and_then(|name| name.strip_suffix('"'))
            .ok_or_else(|| format_error(line_number, format!("physical name {} must be quoted", name)))?;
        groups.push(PhysicalGroup {
            dim: parse_token(dim, line_number)?,
            tag: parse_token(tag, line_number)?,
            name: name.to_string(),
        });
    }
    Ok(groups)
}

fn parse_nodes(reader: &mut LineReader) -> Result<Vec<Point3<f64>>> {
    let count = reader.read_count("Nodes")?;
    let mut nodes_by_id = FxHashMap::default();
    for index in 0..count {
        let (line_number, line) = reader.require_line("Nodes")?;
        if line.starts_with('$') {
            return Err(format_error(
                line_number,
                format!("$Nodes declares {} nodes, but only {} are listed", count, index),
            ));
        }
        let tokens: Vec<_> = line.split_whitespace().collect();
        if tokens.len() != 4 {
            return Err(format_error(line_number, "expected '<id> <x> <y> <z>'"));
        }
        let id: usize = parse_token(tokens[0], line_number)?;
        let x = parse_token(tokens[1], line_number)?;
        let y = parse_token(tokens[2], line_number)?;
        let z = parse_token(tokens[3], line_number)?;
        if !(1..=count).contains(&id) {
            return Err(format_error(
                line_number,
                format!("node id {} is outside the declared range 1..={}", id, count),
            ));
        }
        if nodes_by_id.insert(id, Point3::new(x, y, z)).is_some() {
            return Err(format_error(line_number, format!("duplicate node id {}", id)));
        }
    }
    // Ids are distinct and within 1..=count, so every id is present
    Ok((1..=count).filter_map(|id| nodes_by_id.remove(&id)).collect())
}

fn parse_elements(reader: &mut LineReader) -> Result<Vec<ElementRecord>> {
    let count = reader.read_count("Elements")?;
    let mut elements = Vec::with_capacity(count);
    for index in 0..count {
        let (line_number, line) = reader.require_line("Elements")?;
        if line.starts_with('$') {
            return Err(format_error(
                line_number,
                format!("$Elements declares {} elements, but only {} are listed", count, index),
            ));
        }
        let tokens = line
            .split_whitespace()
            .map(|token| parse_token(token, line_number))
            .collect::<Result<Vec<usize>>>()?;
        if tokens.len() < 3 {
            return Err(format_error(line_number, "expected '<id> <type> <num-tags> ...'"));
        }
        let gmsh_type = tokens[1];
        let num_tags = tokens[2];
        let info = gmsh_element_info(gmsh_type).ok_or_else(|| {
            Error::ElementType(format!("line {}: unsupported Gmsh element type {}", line_number, gmsh_type))
        })?;
        let expected_len = 3 + num_tags + info.num_nodes;
        if tokens.len() != expected_len {
            return Err(format_error(
                line_number,
                format!(
                    "element of type {} with {} tags must have {} entries, found {}",
                    gmsh_type,
                    num_tags,
                    expected_len,
                    tokens.len()
                ),
            ));
        }
        let physical_tag = if num_tags > 0 { tokens[3] } else { 0 };
        elements.push(ElementRecord {
            line_number,
            gmsh_type,
            physical_tag,
            node_ids: tokens[3 + num_tags..].to_vec(),
        });
    }
    Ok(elements)
}
