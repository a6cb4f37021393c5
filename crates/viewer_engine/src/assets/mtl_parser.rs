//! MTL (Material Template Library) file parser
//!
//! Parses Wavefront .mtl files into the colours and texture maps the viewer's
//! material roles use. Statements the viewer has no use for are skipped.

use std::str::SplitWhitespace;

use crate::assets::ParseIssue;

/// Parsed MTL material data (Wavefront Phong model)
#[derive(Debug, Clone, PartialEq)]
pub struct MtlData {
    /// Material name
    pub name: String,
    /// Diffuse color (Kd)
    pub diffuse: [f32; 3],
    /// Specular color (Ks)
    pub specular: [f32; 3],
    /// Specular exponent (Ns)
    pub specular_exponent: f32,
    /// Dissolve/opacity (d) - 0.0 = transparent, 1.0 = opaque
    pub dissolve: f32,
    /// Diffuse texture map (map_Kd)
    pub diffuse_map: Option<String>,
    /// Specular texture map (map_Ks)
    pub specular_map: Option<String>,
    /// Normal map (map_Bump, bump or norm)
    pub normal_map: Option<String>,
}

impl MtlData {
    fn named(name: String) -> Self {
        Self {
            name,
            diffuse: [1.0, 1.0, 1.0],
            specular: [0.5, 0.5, 0.5],
            specular_exponent: 32.0,
            dissolve: 1.0,
            diffuse_map: None,
            specular_map: None,
            normal_map: None,
        }
    }
}

/// MTL file parser
pub struct MtlParser;

impl MtlParser {
    /// Parse MTL file contents into materials, in declaration order
    ///
    /// Statements before the first `newmtl` are ignored.
    pub fn parse(contents: &str) -> Result<Vec<MtlData>, ParseIssue> {
        let mut materials = Vec::new();
        let mut current: Option<MtlData> = None;

        for (line_index, line) in contents.lines().enumerate() {
            let line_num = line_index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(command) = tokens.next() else {
                continue;
            };

            if command == "newmtl" {
                if let Some(material) = current.take() {
                    materials.push(material);
                }
                let name = tokens
                    .next()
                    .ok_or_else(|| ParseIssue::new(line_num, "newmtl missing material name"))?;
                current = Some(MtlData::named(name.to_string()));
                continue;
            }

            let Some(material) = current.as_mut() else {
                continue;
            };

            match command {
                "Kd" => material.diffuse = Self::parse_vec3(&mut tokens, line_num, command)?,
                "Ks" => material.specular = Self::parse_vec3(&mut tokens, line_num, command)?,
                "Ns" => material.specular_exponent = Self::parse_f32(&mut tokens, line_num, command)?,
                "d" => material.dissolve = Self::parse_f32(&mut tokens, line_num, command)?,
                "Tr" => {
                    material.dissolve = 1.0 - Self::parse_f32(&mut tokens, line_num, command)?;
                }
                "map_Kd" => {
                    material.diffuse_map = Some(Self::parse_texture_path(line, line_num, command)?);
                }
                "map_Ks" => {
                    material.specular_map = Some(Self::parse_texture_path(line, line_num, command)?);
                }
                "map_Bump" | "map_bump" | "bump" | "norm" => {
                    material.normal_map = Some(Self::parse_texture_path(line, line_num, command)?);
                }
                _ => {}
            }
        }

        if let Some(material) = current {
            materials.push(material);
        }

        Ok(materials)
    }

    fn parse_f32(tokens: &mut SplitWhitespace<'_>, line_num: usize, command: &str) -> Result<f32, ParseIssue> {
        let token = tokens
            .next()
            .ok_or_else(|| ParseIssue::new(line_num, format!("{command} missing value")))?;
        token
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseIssue::new(line_num, format!("{command} has invalid value '{token}'")))
    }

    fn parse_vec3(tokens: &mut SplitWhitespace<'_>, line_num: usize, command: &str) -> Result<[f32; 3], ParseIssue> {
        let values = tokens
            .map(|token| token.parse::<f32>().ok().filter(|value| value.is_finite()))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| ParseIssue::new(line_num, format!("{command} has an invalid value")))?;

        // A single value means a grey colour
        match values.as_slice() {
            [v] => Ok([*v, *v, *v]),
            [r, g, b] => Ok([*r, *g, *b]),
            _ => Err(ParseIssue::new(line_num, format!("{command} needs 1 or 3 values"))),
        }
    }

    /// Texture statements may carry options (`-bm 1.0 file.png`); the file
    /// name is the trailing token
    fn parse_texture_path(line: &str, line_num: usize, command: &str) -> Result<String, ParseIssue> {
        let mut tokens = line.split_whitespace().skip(1).peekable();
        let mut path = None;
        while let Some(token) = tokens.next() {
            if token.starts_with('-') && tokens.peek().is_some() {
                let arity = match token {
                    "-o" | "-s" | "-t" => 3,
                    "-mm" => 2,
                    _ => 1,
                };
                for _ in 0..arity {
                    tokens.next();
                }
            } else {
                path = Some(token);
            }
        }
        path.map(|p| p.replace('\\', "/"))
            .ok_or_else(|| ParseIssue::new(line_num, format!("{command} missing texture path")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_materials_in_order() {
        let mtl = "\
# two materials
newmtl Body
Kd 0.8 0.1 0.1
Ks 0.2
Ns 64
map_Kd textures\\body_diffuse.png
map_Ks body_spec.png

newmtl Glass
d 0.25
map_Bump -bm 0.5 glass_normal.png
";
        let materials = MtlParser::parse(mtl).unwrap();
        assert_eq!(materials.len(), 2);

        let body = &materials[0];
        assert_eq!(body.name, "Body");
        assert_eq!(body.diffuse, [0.8, 0.1, 0.1]);
        assert_eq!(body.specular, [0.2, 0.2, 0.2]);
        assert_eq!(body.specular_exponent, 64.0);
        assert_eq!(body.diffuse_map.as_deref(), Some("textures/body_diffuse.png"));
        assert_eq!(body.specular_map.as_deref(), Some("body_spec.png"));
        assert_eq!(body.normal_map, None);

        let glass = &materials[1];
        assert_eq!(glass.dissolve, 0.25);
        assert_eq!(glass.normal_map.as_deref(), Some("glass_normal.png"));
        assert_eq!(glass.diffuse_map, None);
    }

    #[test]
    fn test_statements_before_newmtl_are_ignored() {
        let materials = MtlParser::parse("Kd 1 0 0\nnewmtl A\n").unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].diffuse, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let issue = MtlParser::parse("newmtl A\n\nKd 1 oops 0\n").unwrap_err();
        assert_eq!(issue.line, 3);

        let issue = MtlParser::parse("newmtl\n").unwrap_err();
        assert_eq!(issue.line, 1);

        let issue = MtlParser::parse("newmtl A\nmap_Kd\n").unwrap_err();
        assert_eq!(issue.line, 2);
    }
}
