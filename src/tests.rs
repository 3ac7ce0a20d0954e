use std::collections::HashMap;

use crate::{
    process_program, BoxedIncludeProviderError, ElementType, IncludeProvider, PrepperError,
    ResolvedIncludePath, ShaderProgram, Uniform, UniformValues,
};

struct HashMapIncludeProvider(HashMap<String, String>);

impl HashMapIncludeProvider {
    fn new(files: &[(&str, &str)]) -> Self {
        Self(
            files
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        )
    }
}

impl IncludeProvider for HashMapIncludeProvider {
    fn resolve_path(&self, path: &str) -> Result<ResolvedIncludePath, BoxedIncludeProviderError> {
        Ok(ResolvedIncludePath(path.to_owned()))
    }

    fn get_include(
        &mut self,
        resolved: &ResolvedIncludePath,
    ) -> Result<String, BoxedIncludeProviderError> {
        self.0
            .get(&resolved.0)
            .cloned()
            .ok_or_else(|| format!("no such file: {}", resolved.0).into())
    }
}

fn process(files: &[(&str, &str)]) -> ShaderProgram {
    process_program(files[0].0, &mut HashMapIncludeProvider::new(files))
}

fn errors(program: &ShaderProgram) -> Vec<PrepperError> {
    program
        .diagnostics
        .iter()
        .filter(|d| !d.is_warning())
        .map(|d| d.error.clone())
        .collect()
}

fn uniform<'a>(program: &'a ShaderProgram, name: &str) -> &'a Uniform {
    program
        .uniforms
        .iter()
        .find(|u| u.name == name)
        .unwrap_or_else(|| panic!("no uniform {} in {:?}", name, program.uniforms))
}

#[test]
fn plain_glsl_is_copied_verbatim() {
    let source = "#version 330 core\n\
                  out vec4 color;\n\
                  \n\
                  void main() {\n\
                  \tcolor = vec4(gl_FragCoord.xy * 0.5, -1.0, 1.0f); // \"quoted\"\n\
                  }\n";
    let program = process(&[("main.frag", source)]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(program.fragment_shader_code(), source);
    assert_eq!(program.vertex_shader_code(), "");
    assert!(program.uniforms.is_empty());
}

#[test]
fn processing_is_deterministic() {
    let files = [
        (
            "main.frag",
            "#include \"common.glsl\"\nuniform vec3 b = (1, 2, 3);\nuniform int a;\n",
        ),
        ("common.glsl", "struct L { vec3 c; float i; };\nuniform L light;\n"),
    ];

    let first = process(&files);
    let second = process(&files);

    assert_eq!(first.fragment_shader_code(), second.fragment_shader_code());
    assert_eq!(first.uniforms, second.uniforms);

    let names: Vec<_> = first.uniforms.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "light.c", "light.i"]);
}

#[test]
fn include_expanded_once_per_chain() {
    let program = process(&[
        (
            "main.frag",
            "#include \"a.glsl\"\n#include \"b.glsl\"\n#include \"a.glsl\"\n",
        ),
        ("a.glsl", "int a;\n"),
        ("b.glsl", "#include \"a.glsl\"\nint b;\n"),
    ]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(program.fragment_shader_code().matches("int a;").count(), 1);
    assert_eq!(program.fragment_shader_code(), " int a;\n\n  \nint b;\n\n \n");
}

#[test]
fn vector_uniform_with_defaults() {
    let program = process(&[("main.frag", "uniform vec3 p = (1, 2, 3);\n")]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(
        program.uniforms,
        vec![Uniform::new("p", UniformValues::Float(vec![1.0, 2.0, 3.0]))]
    );
    assert_eq!(program.uniforms[0].element_type(), ElementType::Float);

    // Initializers are not valid GLSL for uniforms, so they are dropped from the output.
    assert_eq!(program.fragment_shader_code(), "uniform vec3 p    ;\n");
}

#[test]
fn struct_uniform_flattens_to_fields() {
    let program = process(&[(
        "main.frag",
        "struct S { int a; float b; };\nuniform S s;\n",
    )]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(
        program.uniforms,
        vec![
            Uniform::new("s.a", UniformValues::Integer(vec![0])),
            Uniform::new("s.b", UniformValues::Float(vec![0.0])),
        ]
    );
    assert_eq!(
        program.fragment_shader_code(),
        "struct S { int a; float b; };\n\nuniform S s;\n"
    );
}

#[test]
fn nested_structs_keep_template_defaults() {
    let program = process(&[(
        "main.frag",
        "struct Inner { bvec2 flags = (true, false); };\n\
         struct Outer { Inner inner; double d = -2.5; };\n\
         uniform Outer o;\n\
         uniform Inner i;\n",
    )]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(
        uniform(&program, "o.inner.flags").values,
        UniformValues::Boolean(vec![true, false])
    );
    assert_eq!(uniform(&program, "o.d").values, UniformValues::Double(vec![-2.5]));
    assert_eq!(
        uniform(&program, "i.flags").values,
        UniformValues::Boolean(vec![true, false])
    );
}

#[test]
fn scalar_literals() {
    let program = process(&[(
        "main.frag",
        "uniform int i = -4;\n\
         uniform uint u = 7;\n\
         uniform float f = 1.5f;\n\
         uniform bool b = true;\n\
         uniform ivec2 iv = (-1, 2);\n\
         uniform uvec2 uv;\n\
         uniform dvec2 dv = (3, -0.25);\n",
    )]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(uniform(&program, "i").values, UniformValues::Integer(vec![-4]));
    assert_eq!(uniform(&program, "u").values, UniformValues::Unsigned(vec![7]));
    assert_eq!(uniform(&program, "f").values, UniformValues::Float(vec![1.5]));
    assert_eq!(uniform(&program, "b").values, UniformValues::Boolean(vec![true]));
    assert_eq!(uniform(&program, "iv").values, UniformValues::Integer(vec![-1, 2]));
    assert_eq!(uniform(&program, "uv").values, UniformValues::Unsigned(vec![0, 0]));
    assert_eq!(uniform(&program, "dv").values, UniformValues::Double(vec![3.0, -0.25]));
}

#[test]
fn negative_unsigned_is_rejected() {
    let program = process(&[("main.frag", "uniform uint u = -1;\nuniform int ok = 1;\n")]);

    assert!(!program.is_valid());
    assert!(matches!(
        errors(&program).as_slice(),
        [PrepperError::UnexpectedToken { .. }]
    ));
    assert_eq!(program.uniforms, vec![Uniform::new("ok", UniformValues::Integer(vec![1]))]);
}

#[test]
fn redeclared_uniform_overwrites_and_first_struct_wins() {
    let program = process(&[(
        "main.frag",
        "struct S { int a; };\n\
         struct S { float b; };\n\
         uniform float x = 1.0;\n\
         uniform float x = 2.0;\n\
         uniform S s;\n",
    )]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(uniform(&program, "x").values, UniformValues::Float(vec![2.0]));
    assert_eq!(
        program.uniforms.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(),
        vec!["s.a", "x"]
    );
}

#[test]
fn two_vertex_shaders_in_one_file() {
    let program = process(&[
        (
            "main.frag",
            "#vertex_shader \"a.vert\"\n#vertex_shader \"b.vert\"\n",
        ),
        ("a.vert", "void a() {}\n"),
        ("b.vert", "void b() {}\n"),
    ]);

    assert!(!program.is_valid());
    assert_eq!(errors(&program), vec![PrepperError::MultipleVertexShaders]);
    assert_eq!(program.diagnostics[0].line, 2);
    assert_eq!(program.vertex_shader_code(), "void a() {}\n");
}

#[test]
fn two_vertex_shaders_through_includes() {
    let program = process(&[
        (
            "main.frag",
            "#vertex_shader \"a.vert\"\n#include \"other.frag\"\n",
        ),
        ("other.frag", "#vertex_shader \"b.vert\"\n"),
        ("a.vert", "void a() {}\n"),
        ("b.vert", "void b() {}\n"),
    ]);

    assert!(!program.is_valid());
    assert_eq!(errors(&program), vec![PrepperError::MultipleVertexShaders]);
    assert_eq!(program.diagnostics[0].file, "main.frag");
    assert_eq!(program.vertex_shader_code(), "void a() {}\n");
}

#[test]
fn linked_vertex_shader() {
    let program = process(&[
        (
            "main.frag",
            "#vertex_shader \"quad.vert\"\n#include \"common.glsl\"\nuniform float time;\n",
        ),
        (
            "quad.vert",
            "#include \"common.glsl\"\nuniform vec2 offset = (0.5, 0.5);\n",
        ),
        ("common.glsl", "uniform int frame;\n"),
    ]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);

    // The linked vertex shader is a separate include chain, so common.glsl is expanded in both.
    assert_eq!(
        program.vertex_shader_code(),
        " uniform int frame;\n\nuniform vec2 offset   ;\n"
    );
    assert!(program.fragment_shader_code().contains("uniform int frame;"));
    assert!(!program.fragment_shader_code().contains("offset"));

    let names: Vec<_> = program.uniforms.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["frame", "offset", "time"]);
}

#[test]
fn vertex_shader_directive_checks() {
    let program = process(&[
        ("main.glsl.vert", "#vertex_shader \"main.frag\"\n"),
        ("main.frag", "void main() {}\n"),
    ]);

    assert_eq!(
        errors(&program),
        vec![
            PrepperError::VertexShaderOutsideFragment,
            PrepperError::NotAVertexShader("main.frag".to_owned()),
        ]
    );
}

#[test]
fn unterminated_string_does_not_stop_parsing() {
    let program = process(&[(
        "main.frag",
        "const char* s = \"abc\nuniform float x = 2.0;\n",
    )]);

    assert!(!program.is_valid());
    assert_eq!(errors(&program), vec![PrepperError::MissingClosingQuote]);
    assert_eq!(program.diagnostics[0].line, 1);
    assert_eq!(uniform(&program, "x").values, UniformValues::Float(vec![2.0]));
}

#[test]
fn unknown_type_resyncs_to_next_semicolon() {
    let program = process(&[(
        "main.frag",
        "struct S { Foo f; int a; };\nuniform S s;\nuniform float after = 3.0;\n",
    )]);

    assert!(!program.is_valid());
    assert_eq!(errors(&program), vec![PrepperError::UnknownType("Foo".to_owned())]);
    assert_eq!(program.diagnostics[0].line, 1);

    let names: Vec<_> = program.uniforms.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["after", "s.a"]);
}

#[test]
fn structural_errors_accumulate() {
    let program = process(&[(
        "main.frag",
        "uniform vec2 v = 1;\n\
         uniform float;\n\
         uniform bool b = 1;\n\
         uniform vec10 w;\n\
         uniform int ok = 5;\n",
    )]);

    assert_eq!(
        errors(&program),
        vec![
            PrepperError::UnexpectedToken {
                expected: "an opening parenthesis",
                found: "1".to_owned()
            },
            PrepperError::UnexpectedToken {
                expected: "a variable name",
                found: ";".to_owned()
            },
            PrepperError::UnexpectedToken {
                expected: "a boolean value",
                found: "1".to_owned()
            },
            PrepperError::MalformedVectorType("vec10".to_owned()),
        ]
    );
    let lines: Vec<_> = program.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![1, 2, 3, 4]);
    assert_eq!(program.uniforms, vec![Uniform::new("ok", UniformValues::Integer(vec![5]))]);
}

#[test]
fn unterminated_struct() {
    let program = process(&[("main.frag", "struct S { int a;\n")]);

    assert_eq!(
        errors(&program),
        vec![PrepperError::UnexpectedEof("a closing curly brace")]
    );
}

#[test]
fn missing_include() {
    let program = process(&[(
        "main.frag",
        "#include \"missing.glsl\"\nuniform int a;\n",
    )]);

    assert!(!program.is_valid());
    assert!(matches!(
        errors(&program).as_slice(),
        [PrepperError::FileNotFound { file, .. }] if file == "missing.glsl"
    ));
    assert_eq!(program.uniforms.len(), 1);
    assert!(program.fragment_shader_code().ends_with("uniform int a;\n"));
}

#[test]
fn missing_entry_file() {
    let program = process_program("nope.frag", &mut HashMapIncludeProvider::new(&[]));

    assert!(!program.is_valid());
    assert_eq!(program.diagnostics.len(), 1);
    assert_eq!(program.diagnostics[0].line, 0);
    assert_eq!(program.fragment_shader_code(), "");
    assert!(program.vertex_source.is_empty());
}

#[test]
fn recursive_include_is_reported() {
    let program = process(&[
        ("main.frag", "#include \"a.glsl\"\n"),
        ("a.glsl", "#include \"b.glsl\"\nint a;\n"),
        ("b.glsl", "#include \"main.frag\"\nint b;\n"),
    ]);

    assert_eq!(
        errors(&program),
        vec![PrepperError::RecursiveInclude {
            file: "main.frag".to_owned(),
            from: "b.glsl".to_owned()
        }]
    );
    assert_eq!(program.diagnostics[0].file, "b.glsl");
    assert_eq!(program.fragment_shader_code().matches("int a;").count(), 1);
}

#[test]
fn mutually_including_headers_expand_once() {
    let program = process(&[
        ("main.frag", "#include \"a.glsl\"\n"),
        ("a.glsl", "#include \"b.glsl\"\nint a;\n"),
        ("b.glsl", "#include \"a.glsl\"\nint b;\n"),
    ]);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(program.fragment_shader_code(), "   \nint b;\n\nint a;\n\n");
}

#[test]
fn unquoted_directive_path_is_kept_in_output() {
    let program = process(&[(
        "main.frag",
        "#include <x.glsl>\n#vertex_shader main.vert\nint a;\n",
    )]);

    assert_eq!(
        errors(&program),
        vec![
            PrepperError::UnexpectedToken {
                expected: "a file path after #include",
                found: "<".to_owned()
            },
            PrepperError::UnexpectedToken {
                expected: "a file path after #vertex_shader",
                found: "main".to_owned()
            },
        ]
    );
    assert_eq!(
        program.fragment_shader_code(),
        " <x.glsl>\n main.vert\nint a;\n"
    );
}

#[test]
fn requires_implementation() {
    let template = "#requires_implementation\nvec4 shade();\n";

    let included = process(&[
        ("main.frag", "#include \"template.glsl\"\nvec4 shade() { return vec4(1.0); }\n"),
        ("template.glsl", template),
    ]);
    assert!(included.is_valid(), "{:?}", included.diagnostics);
    assert!(!included.fragment_shader_code().contains("#requires_implementation"));

    let entry = process(&[("template.frag", template)]);
    assert_eq!(errors(&entry), vec![PrepperError::NotAnImplementation]);

    let misplaced = process(&[
        ("main.frag", "#include \"late.glsl\"\n"),
        ("late.glsl", "int x;\n#requires_implementation\n"),
    ]);
    assert_eq!(
        errors(&misplaced),
        vec![PrepperError::MisplacedRequiresImplementation]
    );
    assert_eq!(misplaced.diagnostics[0].line, 2);
}

#[test]
fn duplicate_leaf_names_are_warnings() {
    let program = process(&[(
        "main.frag",
        "struct S { int a; float a; };\nuniform S s;\n",
    )]);

    assert!(program.is_valid());
    assert_eq!(
        program.diagnostics.iter().map(|d| d.error.clone()).collect::<Vec<_>>(),
        vec![PrepperError::UniformCollision("s.a".to_owned())]
    );
    assert_eq!(program.uniforms.len(), 2);
}

#[test]
fn diagnostics_display_file_and_line() {
    let program = process(&[("main.frag", "\nuniform Foo f;\n")]);

    assert_eq!(
        program.diagnostics[0].to_string(),
        "main.frag(2): error: type \"Foo\" not recognized"
    );
}

#[test]
fn line_origins_follow_includes() {
    let program = process(&[
        ("main.frag", "#version 330\n#include \"common.glsl\"\nvoid main() {}\n"),
        ("common.glsl", "float a;\nfloat b;\n"),
    ]);

    let origins: Vec<_> = program
        .fragment_source
        .line_origins()
        .iter()
        .map(|o| (o.file.as_str(), o.line))
        .collect();
    assert_eq!(
        origins,
        vec![
            ("main.frag", 1),
            ("main.frag", 2),
            ("common.glsl", 2),
            ("main.frag", 2),
            ("main.frag", 3),
        ]
    );
}

#[test]
fn file_include_provider() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("lib"))?;
    std::fs::write(
        dir.path().join("main.frag"),
        "#include \"lib/common.glsl\"\nuniform S s;\n",
    )?;
    std::fs::write(dir.path().join("lib/common.glsl"), "struct S { vec2 uv; };\n")?;
    std::fs::write(dir.path().join("broken.frag"), "uniform Missing m;\n")?;
    std::fs::write(dir.path().join("notes.txt"), "not a shader\n")?;

    let mut provider = crate::FileIncludeProvider::new(dir.path());
    let main = dir.path().join("main.frag");
    let program = process_program(main.to_str().unwrap(), &mut provider);

    assert!(program.is_valid(), "{:?}", program.diagnostics);
    assert_eq!(program.uniforms, vec![Uniform::new("s.uv", ElementType::Float.zeroed(2))]);

    let missing_root = dir.path().join("missing");
    let discovery =
        crate::discover_programs(&[dir.path().to_path_buf(), missing_root], "frag", &mut provider);

    assert_eq!(discovery.programs, vec![main]);
    assert_eq!(discovery.diagnostics.len(), 2);
    assert_eq!(
        discovery.diagnostics[0].error,
        PrepperError::UnknownType("Missing".to_owned())
    );
    assert!(matches!(
        discovery.diagnostics[1].error,
        PrepperError::FileNotFound { .. }
    ));

    Ok(())
}
