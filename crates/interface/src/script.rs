//! Line-based scene scripts.
//!
//! ```text
//! # comment
//! OpenPlugin PlasticShader
//! NewCamera cam1 PerspectiveCamera
//! SetProperty3 cam1 translate 0 1.5 7
//! NewMesh floor "meshes/floor plane.mesh"
//! ```
//!
//! One command per line, whitespace-separated arguments. Arguments may be
//! wrapped in single or double quotes; there are no escapes. `#` starts a
//! comment outside quotes.

use crate::command::{Command, SceneInterface};
use raystage_common::PropertyValue;

/// A script line that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based.
    pub line: usize,
    pub message: String,
}

/// Parse a whole script into a command queue.
pub fn parse(source: &str) -> Result<SceneInterface, ParseError> {
    let mut si = SceneInterface::new();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let fail = |message: String| ParseError { line, message };
        let tokens = tokenize(text).map_err(|m| fail(m.into()))?;
        let Some((keyword, args)) = tokens.split_first() else {
            continue;
        };
        si.push(command(keyword, args).map_err(fail)?);
    }
    Ok(si)
}

fn command(keyword: &str, args: &[String]) -> Result<Command, String> {
    let want = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(format!(
                "{keyword} takes {n} argument(s), got {}",
                args.len()
            ))
        }
    };
    let a = |i: usize| args[i].clone();

    let command = match keyword {
        "OpenPlugin" => {
            want(1)?;
            Command::OpenPlugin(a(0))
        }
        "NewCamera" => {
            want(2)?;
            Command::NewCamera {
                name: a(0),
                type_name: a(1),
            }
        }
        "NewLight" => {
            want(2)?;
            Command::NewLight {
                name: a(0),
                type_name: a(1),
            }
        }
        "NewShader" => {
            want(2)?;
            Command::NewShader {
                name: a(0),
                type_name: a(1),
            }
        }
        "NewMesh" => {
            want(2)?;
            Command::NewMesh {
                name: a(0),
                path: a(1).into(),
            }
        }
        "NewObjectInstance" => {
            want(2)?;
            Command::NewObjectInstance {
                name: a(0),
                mesh: a(1),
            }
        }
        "NewObjectGroup" => {
            want(1)?;
            Command::NewObjectGroup(a(0))
        }
        "AddObjectToGroup" => {
            want(2)?;
            Command::AddObjectToGroup {
                group: a(0),
                instance: a(1),
            }
        }
        "NewFrameBuffer" => {
            want(2)?;
            Command::NewFrameBuffer {
                name: a(0),
                layout: a(1),
            }
        }
        "NewRenderer" => {
            want(1)?;
            Command::NewRenderer(a(0))
        }
        "SetProperty1" | "SetProperty2" | "SetProperty3" | "SetProperty" => {
            let arity = match keyword.as_bytes().last().copied() {
                Some(b @ b'1'..=b'3') => Some((b - b'0') as usize),
                _ => None,
            };
            match arity {
                Some(n) => want(2 + n)?,
                None if (3..=5).contains(&args.len()) => {}
                None => {
                    return Err(format!(
                        "SetProperty takes an entity, a key and 1 to 3 values, got {} argument(s)",
                        args.len()
                    ));
                }
            }
            let values = args[2..]
                .iter()
                .map(|v| {
                    v.parse::<f32>()
                        .map_err(|_| format!("expected a number, got '{v}'"))
                })
                .collect::<Result<Vec<f32>, String>>()?;
            Command::SetProperty {
                entity: a(0),
                key: a(1),
                value: PropertyValue::from_slice(&values).map_err(|e| e.to_string())?,
            }
        }
        "AssignShader" => {
            want(2)?;
            Command::AssignShader {
                instance: a(0),
                shader: a(1),
            }
        }
        "AssignCamera" => {
            want(2)?;
            Command::AssignCamera {
                renderer: a(0),
                camera: a(1),
            }
        }
        "AssignFrameBuffer" => {
            want(2)?;
            Command::AssignFrameBuffer {
                renderer: a(0),
                framebuffer: a(1),
            }
        }
        "AssignReflectTarget" => {
            want(2)?;
            Command::AssignReflectTarget {
                instance: a(0),
                group: a(1),
            }
        }
        "AssignRefractTarget" => {
            want(2)?;
            Command::AssignRefractTarget {
                instance: a(0),
                group: a(1),
            }
        }
        "RenderScene" => {
            want(1)?;
            Command::RenderScene(a(0))
        }
        "SaveFrameBuffer" => {
            want(2)?;
            Command::SaveFrameBuffer {
                framebuffer: a(0),
                path: a(1).into(),
            }
        }
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(command)
}

fn tokenize(line: &str) -> Result<Vec<String>, &'static str> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&c) = chars.peek() else { break };
        match c {
            '#' => break,
            '"' | '\'' => {
                chars.next();
                let mut token = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(ch) => token.push(ch),
                        None => return Err("unterminated quoted string"),
                    }
                }
                if chars.peek().is_some_and(|ch| !ch.is_whitespace() && *ch != '#') {
                    return Err("closing quote must be followed by whitespace");
                }
                tokens.push(token);
            }
            _ => {
                let mut token = String::new();
                while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace() && *ch != '#') {
                    token.push(ch);
                }
                tokens.push(token);
            }
        }
    }
    Ok(tokens)
}

/// Quote an argument when reading it back would otherwise split or drop it.
pub(crate) fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && !arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\''));
    if plain {
        arg.to_string()
    } else if arg.contains('"') {
        format!("'{arg}'")
    } else {
        format!("\"{arg}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_handles_quotes_and_comments() {
        assert_eq!(
            tokenize(r#"NewMesh m "a b.mesh" 'c d' # trailing"#).unwrap(),
            vec!["NewMesh", "m", "a b.mesh", "c d"]
        );
        assert!(tokenize("   # only a comment").unwrap().is_empty());
        assert_eq!(tokenize("x#y").unwrap(), vec!["x"]);
        assert!(tokenize("NewRenderer \"open").is_err());
    }

    #[test]
    fn parses_full_script() {
        let si = parse(
            "# plugins\n\
             OpenPlugin PlasticShader\n\
             \n\
             NewCamera cam1 PerspectiveCamera\n\
             SetProperty3 cam1 translate 0 1.5 7\n\
             SetProperty ren1 resolution 640 480\n\
             SaveFrameBuffer fb1 'out/glassy happy.fb'\n",
        )
        .unwrap();
        assert_eq!(si.len(), 5);
        assert_eq!(si.commands()[0], Command::OpenPlugin("PlasticShader".into()));
        assert_eq!(
            si.commands()[3],
            Command::SetProperty {
                entity: "ren1".into(),
                key: "resolution".into(),
                value: PropertyValue::vec2(640.0, 480.0),
            }
        );
        assert_eq!(
            si.commands()[4],
            Command::SaveFrameBuffer {
                framebuffer: "fb1".into(),
                path: "out/glassy happy.fb".into(),
            }
        );
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse("OpenPlugin A\n\nFrobnicate x\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("Frobnicate"));

        let err = parse("SetProperty2 ren1 resolution 640\n").unwrap_err();
        assert_eq!(err.line, 1);

        let err = parse("NewRenderer r\nSetProperty1 r cast_shadow no\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("'no'"));

        let err = parse("SetProperty r k 1 2 3 4\n").unwrap_err();
        assert_eq!(err.line, 1);

        let err = parse("NewObjectGroup g\nAddObjectToGroup g\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("AddObjectToGroup takes 2"));
    }

    #[test]
    fn printed_queue_parses_back() {
        let mut si = SceneInterface::new();
        si.open_plugin("GlassShader")
            .new_mesh("odd", "dir/it's here.mesh")
            .new_mesh("spaced", "a b/c.mesh")
            .set_property2("ren", "resolution", 2.0, 2.0)
            .set_property1("ren", "sample_jitter", 0.25)
            .new_object_group("glass things")
            .add_object_to_group("glass things", "ball1")
            .assign_refract_target("ball1", "glass things")
            .save_framebuffer("fb", "out.rsfb");
        let back = parse(&si.print()).unwrap();
        assert_eq!(back.commands(), si.commands());
    }
}
