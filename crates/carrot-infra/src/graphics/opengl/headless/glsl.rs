// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A small GLSL front end: enough to find uniform declarations, lay uniform
//! blocks out with std140 rules and reject obviously broken sources.

use std::fmt;

/// A GLSL type the layout rules know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslType {
    Float,
    Int,
    Uint,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec3,
    IVec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
}

impl GlslType {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "float" => GlslType::Float,
            "int" => GlslType::Int,
            "uint" => GlslType::Uint,
            "bool" => GlslType::Bool,
            "vec2" => GlslType::Vec2,
            "vec3" => GlslType::Vec3,
            "vec4" => GlslType::Vec4,
            "ivec2" => GlslType::IVec2,
            "ivec3" => GlslType::IVec3,
            "ivec4" => GlslType::IVec4,
            "mat2" => GlslType::Mat2,
            "mat3" => GlslType::Mat3,
            "mat4" => GlslType::Mat4,
            "sampler2D" => GlslType::Sampler2D,
            "samplerCube" => GlslType::SamplerCube,
            _ => return None,
        })
    }

    /// Returns `true` for opaque types, which cannot live in a uniform block.
    pub fn is_opaque(self) -> bool {
        matches!(self, GlslType::Sampler2D | GlslType::SamplerCube)
    }

    /// std140 `(base alignment, size)` of one element.
    fn std140(self) -> (usize, usize) {
        match self {
            GlslType::Float | GlslType::Int | GlslType::Uint | GlslType::Bool => (4, 4),
            GlslType::Vec2 | GlslType::IVec2 => (8, 8),
            GlslType::Vec3 | GlslType::IVec3 => (16, 12),
            GlslType::Vec4 | GlslType::IVec4 => (16, 16),
            // Matrices are arrays of column vectors padded to vec4.
            GlslType::Mat2 => (16, 32),
            GlslType::Mat3 => (16, 48),
            GlslType::Mat4 => (16, 64),
            GlslType::Sampler2D | GlslType::SamplerCube => (4, 4),
        }
    }
}

/// A `uniform` declared outside any block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseUniform {
    pub ty: GlslType,
    pub name: String,
    pub array_len: Option<u32>,
}

/// One member of a uniform block, with its std140 offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMember {
    pub ty: GlslType,
    pub name: String,
    pub array_len: Option<u32>,
    pub offset: u32,
}

/// A `uniform Name { ... } instance;` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDecl {
    pub name: String,
    pub instance: Option<String>,
    pub binding: Option<u32>,
    pub members: Vec<BlockMember>,
    pub size: usize,
}

impl BlockDecl {
    /// Two declarations of the same block must agree member for member.
    pub fn same_layout(&self, other: &BlockDecl) -> bool {
        self.members == other.members
    }

    /// Active uniform names as GL reports them.
    ///
    /// Members of a block with an instance name are prefixed with the block
    /// name; arrays are reported by their first element.
    pub fn reported_names(&self) -> impl Iterator<Item = (&BlockMember, String)> + '_ {
        self.members.iter().map(move |m| {
            let mut name = match &self.instance {
                Some(_) => format!("{}.{}", self.name, m.name),
                None => m.name.clone(),
            };
            if m.array_len.is_some() {
                name.push_str("[0]");
            }
            (m, name)
        })
    }
}

/// Everything the headless compiler extracts from one shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderLayout {
    pub blocks: Vec<BlockDecl>,
    pub uniforms: Vec<LooseUniform>,
}

/// A compile error, formatted like a driver info log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for GlslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0:{}: error: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    line: usize,
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Removes comments and preprocessor lines, keeping line breaks so error
/// lines stay accurate.
fn strip(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut at_line_start = true;
    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        at_line_start = true;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            '#' if at_line_start => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '\n' => {
                out.push('\n');
                at_line_start = true;
            }
            c if c.is_whitespace() => out.push(c),
            c => {
                out.push(c);
                at_line_start = false;
            }
        }
    }
    out
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_line = 1;
    let mut line = 1;
    for c in source.chars() {
        if c.is_alphanumeric() || c == '_' {
            if current.is_empty() {
                current_line = line;
            }
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            tokens.push(Token {
                text: std::mem::take(&mut current),
                line: current_line,
            });
        }
        if c == '\n' {
            line += 1;
        } else if !c.is_whitespace() {
            tokens.push(Token {
                text: c.to_string(),
                line,
            });
        }
    }
    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            line: current_line,
        });
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|t| t.text.as_str())
    }

    fn peek_at(&self, offset: usize) -> Option<&str> {
        self.tokens.get(self.pos + offset).map(|t| t.text.as_str())
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn error(&self, message: impl Into<String>) -> GlslError {
        GlslError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn next(&mut self) -> Result<String, GlslError> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of source"))?;
        self.pos += 1;
        Ok(token.text.clone())
    }

    fn expect(&mut self, expected: &str) -> Result<(), GlslError> {
        let line = self.line();
        let found = self.next()?;
        if found == expected {
            Ok(())
        } else {
            Err(GlslError {
                line,
                message: format!("syntax error: expected '{expected}', found '{found}'"),
            })
        }
    }

    fn identifier(&mut self) -> Result<String, GlslError> {
        let line = self.line();
        let token = self.next()?;
        let valid = token
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_');
        if valid {
            Ok(token)
        } else {
            Err(GlslError {
                line,
                message: format!("syntax error: expected identifier, found '{token}'"),
            })
        }
    }

    fn glsl_type(&mut self) -> Result<GlslType, GlslError> {
        let line = self.line();
        let token = self.next()?;
        GlslType::parse(&token).ok_or(GlslError {
            line,
            message: format!("unknown type '{token}'"),
        })
    }

    /// Parses an optional `[N]` suffix.
    fn array_suffix(&mut self) -> Result<Option<u32>, GlslError> {
        if self.peek() != Some("[") {
            return Ok(None);
        }
        self.pos += 1;
        let line = self.line();
        let len = self.next()?;
        let len = len
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(GlslError {
                line,
                message: format!("array size must be a positive integer constant, found '{len}'"),
            })?;
        self.expect("]")?;
        Ok(Some(len))
    }

    /// Parses `layout(...)` and returns the `binding` qualifier, if present.
    fn layout(&mut self) -> Result<Option<u32>, GlslError> {
        self.expect("layout")?;
        self.expect("(")?;
        let mut binding = None;
        loop {
            let key = self.next()?;
            match key.as_str() {
                ")" => break,
                "," => continue,
                _ => {
                    if self.peek() == Some("=") {
                        self.pos += 1;
                        let value = self.next()?;
                        if key == "binding" {
                            binding = Some(value.parse::<u32>().map_err(|_| {
                                self.error(format!("invalid binding value '{value}'"))
                            })?);
                        }
                    }
                }
            }
        }
        Ok(binding)
    }

    fn block(&mut self, name: String, binding: Option<u32>) -> Result<BlockDecl, GlslError> {
        self.expect("{")?;
        let mut members = Vec::new();
        let mut cursor = 0usize;
        while self.peek() != Some("}") {
            let ty = self.glsl_type()?;
            if ty.is_opaque() {
                return Err(self.error(format!("opaque type not allowed in uniform block '{name}'")));
            }
            loop {
                let member = self.identifier()?;
                let array_len = self.array_suffix()?;
                let (align, size) = ty.std140();
                let (align, total) = match array_len {
                    Some(n) => {
                        let stride = round_up(size, 16);
                        (16, stride * n as usize)
                    }
                    None => (align, size),
                };
                let offset = round_up(cursor, align);
                cursor = offset + total;
                members.push(BlockMember {
                    ty,
                    name: member,
                    array_len,
                    offset: offset as u32,
                });
                if self.peek() == Some(",") {
                    self.pos += 1;
                    continue;
                }
                break;
            }
            self.expect(";")?;
        }
        self.expect("}")?;
        let instance = if self.peek() == Some(";") {
            None
        } else {
            let instance = self.identifier()?;
            // Instance arrays are not supported by the headless compiler.
            if self.peek() == Some("[") {
                return Err(self.error("uniform block instance arrays are not supported"));
            }
            Some(instance)
        };
        self.expect(";")?;
        if members.is_empty() {
            return Err(self.error(format!("uniform block '{name}' has no members")));
        }
        Ok(BlockDecl {
            name,
            instance,
            binding,
            members,
            size: round_up(cursor, 16),
        })
    }

    fn loose_uniforms(&mut self, out: &mut Vec<LooseUniform>) -> Result<(), GlslError> {
        let ty = self.glsl_type()?;
        loop {
            let name = self.identifier()?;
            let array_len = self.array_suffix()?;
            out.push(LooseUniform {
                ty,
                name,
                array_len,
            });
            if self.peek() == Some(",") {
                self.pos += 1;
                continue;
            }
            break;
        }
        self.expect(";")
    }
}

fn check_balance(tokens: &[Token]) -> Result<(), GlslError> {
    let mut stack: Vec<(&str, usize)> = Vec::new();
    for token in tokens {
        match token.text.as_str() {
            open @ ("{" | "(" | "[") => stack.push((open, token.line)),
            close @ ("}" | ")" | "]") => {
                let expected = match close {
                    "}" => "{",
                    ")" => "(",
                    _ => "[",
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return Err(GlslError {
                            line: token.line,
                            message: format!("syntax error: unexpected '{close}'"),
                        })
                    }
                }
            }
            _ => {}
        }
    }
    match stack.pop() {
        Some((open, line)) => Err(GlslError {
            line,
            message: format!("syntax error: unmatched '{open}'"),
        }),
        None => Ok(()),
    }
}

/// Parses a GLSL source and returns its uniform layout.
pub fn parse(source: &str) -> Result<ShaderLayout, GlslError> {
    let tokens = tokenize(&strip(source));
    check_balance(&tokens)?;

    let has_main = tokens
        .windows(3)
        .any(|w| w[0].text == "void" && w[1].text == "main" && w[2].text == "(");
    if !has_main {
        return Err(GlslError {
            line: tokens.last().map_or(1, |t| t.line),
            message: "missing entry point 'void main()'".to_string(),
        });
    }

    let mut parser = Parser { tokens, pos: 0 };
    let mut layout = ShaderLayout::default();
    let mut depth = 0usize;

    while let Some(token) = parser.peek() {
        match token {
            "{" => {
                depth += 1;
                parser.pos += 1;
            }
            "}" => {
                depth = depth.saturating_sub(1);
                parser.pos += 1;
            }
            "layout" if depth == 0 => {
                let binding = parser.layout()?;
                if parser.peek() == Some("uniform") {
                    parser.pos += 1;
                    if parser.peek_at(1) == Some("{") {
                        let name = parser.identifier()?;
                        layout.blocks.push(parser.block(name, binding)?);
                    } else {
                        parser.loose_uniforms(&mut layout.uniforms)?;
                    }
                }
            }
            "uniform" if depth == 0 => {
                parser.pos += 1;
                if parser.peek_at(1) == Some("{") {
                    let name = parser.identifier()?;
                    layout.blocks.push(parser.block(name, None)?);
                } else {
                    parser.loose_uniforms(&mut layout.uniforms)?;
                }
            }
            _ => parser.pos += 1,
        }
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PER_FRAME: &str = r#"
        #version 330 core
        layout(std140, binding = 2) uniform PerFrame {
            mat4 model;
            mat4 view;
            mat4 projection;
        };
        uniform sampler2D albedoMap;
        void main() { gl_Position = vec4(0.0); }
    "#;

    #[test]
    fn block_with_binding() {
        let layout = parse(PER_FRAME).unwrap();
        assert_eq!(layout.blocks.len(), 1);
        let block = &layout.blocks[0];
        assert_eq!(block.name, "PerFrame");
        assert_eq!(block.binding, Some(2));
        assert_eq!(block.instance, None);
        let offsets: Vec<u32> = block.members.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 64, 128]);
        assert_eq!(block.size, 192);
        assert_eq!(layout.uniforms.len(), 1);
        assert_eq!(layout.uniforms[0].name, "albedoMap");
    }

    #[test]
    fn std140_packing() {
        let src = r#"
            uniform Light {
                vec3 lightPos;   // 0
                float intensity; // 12, packs after vec3
                vec3 lightColor; // 16
                vec2 falloff;    // 32
                float weights[3];// 48, stride 16
                mat3 basis;      // 96
                int mode;        // 144
            } light;
            void main() {}
        "#;
        let block = &parse(src).unwrap().blocks[0];
        let offsets: Vec<(&str, u32)> = block
            .members
            .iter()
            .map(|m| (m.name.as_str(), m.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("lightPos", 0),
                ("intensity", 12),
                ("lightColor", 16),
                ("falloff", 32),
                ("weights", 48),
                ("basis", 96),
                ("mode", 144),
            ]
        );
        assert_eq!(block.size, 160);
        assert_eq!(block.instance.as_deref(), Some("light"));
    }

    #[test]
    fn reported_names_follow_instance_rules() {
        let src = "uniform Light { vec3 lightPos; vec4 colors[2]; } light; void main() {}";
        let block = &parse(src).unwrap().blocks[0];
        let names: Vec<String> = block.reported_names().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["Light.lightPos", "Light.colors[0]"]);

        let src = "uniform Light { vec3 lightPos; }; void main() {}";
        let block = &parse(src).unwrap().blocks[0];
        let names: Vec<String> = block.reported_names().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["lightPos"]);
    }

    #[test]
    fn comma_separated_members() {
        let src = "uniform M { float a, b; vec4 c; }; uniform float x, y[2]; void main() {}";
        let layout = parse(src).unwrap();
        let offsets: Vec<u32> = layout.blocks[0].members.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 4, 16]);
        assert_eq!(layout.uniforms.len(), 2);
        assert_eq!(layout.uniforms[1].array_len, Some(2));
    }

    #[test]
    fn missing_main_is_an_error() {
        let err = parse("uniform float x;").unwrap_err();
        assert!(err.message.contains("main"));
    }

    #[test]
    fn unbalanced_braces_are_an_error() {
        let err = parse("void main() {\n  if (true) {\n}").unwrap_err();
        assert!(err.message.contains("unmatched"));
        assert_eq!(err.to_string(), "0:1: error: syntax error: unmatched '{'");
    }

    #[test]
    fn unknown_member_type_is_an_error() {
        let err = parse("uniform B {\n  quat q;\n};\nvoid main() {}").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "unknown type 'quat'");
    }

    #[test]
    fn uniforms_inside_functions_are_ignored() {
        let src = "void main() { float uniform_scale = 1.0; }";
        let layout = parse(src).unwrap();
        assert!(layout.uniforms.is_empty());
        assert!(layout.blocks.is_empty());
    }
}
