use std::path::PathBuf;

use gradient_forge::{
    dsl,
    geometry::{Matrix, Point},
    pdf::{EmittedObject, InMemoryDocument, ObjectRef, PdfDict, PdfObject},
    shader::{self, GradientCache, validation},
};

fn cases_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("cases")
}

struct Compiled {
    doc: InMemoryDocument,
    cache: GradientCache,
    patterns: Vec<(String, Option<ObjectRef>)>,
}

fn compile_case(name: &str) -> Compiled {
    let path = cases_root().join(name).join("scene.json");
    let scene = dsl::load_scene_from_path(&path)
        .unwrap_or_else(|e| panic!("case {name}: failed to load scene {}: {e:#}", path.display()));

    let mut doc = InMemoryDocument::new();
    let mut cache = GradientCache::new();
    let mut patterns = Vec::new();
    for draw in &scene.gradients {
        let pattern = shader::compile_gradient(
            &mut doc,
            &mut cache,
            &draw.shader,
            &draw.canvas_matrix,
            draw.bbox,
        )
        .unwrap_or_else(|e| panic!("case {name}, gradient {}: emitter failure: {e:#}", draw.id));
        patterns.push((draw.id.clone(), pattern));
    }

    for (r, obj) in doc.iter() {
        if obj.dict.get("FunctionType").and_then(PdfObject::as_i64) == Some(4) {
            let text = obj.stream_text().expect("calculator function stream is text");
            let context = format!("case {name}, object {}", r.number());
            validation::validate_program_with_context(text, &context)
                .unwrap_or_else(|e| panic!("{e:#}"));
        }
    }

    Compiled { doc, cache, patterns }
}

fn shading_of(doc: &InMemoryDocument, pattern: ObjectRef) -> PdfDict {
    doc.get(pattern)
        .and_then(|p| p.dict.get("Shading"))
        .and_then(PdfObject::as_dict)
        .cloned()
        .expect("pattern carries an inline shading")
}

fn function_of<'a>(doc: &'a InMemoryDocument, shading: &PdfDict) -> &'a EmittedObject {
    let r = shading
        .get("Function")
        .and_then(PdfObject::as_object_ref)
        .expect("shading function is an indirect object");
    doc.get(r).expect("function object exists")
}

#[test]
fn linear_white_black() {
    let c = compile_case("linear-white-black");
    let pattern = c.patterns[0].1.expect("ramp compiles");
    let shading = shading_of(&c.doc, pattern);
    assert_eq!(
        shading.get("ShadingType").and_then(PdfObject::as_i64),
        Some(2)
    );
    assert_eq!(
        shading.get("Coords").and_then(PdfObject::as_f32_vec),
        Some(vec![0.0, 0.0, 200.0, 0.0])
    );
    assert_eq!(
        shading.get("Extend"),
        Some(&PdfObject::Array(vec![PdfObject::Bool(true), PdfObject::Bool(true)]))
    );

    let function = &function_of(&c.doc, &shading).dict;
    let c0 = function.get("C0").and_then(PdfObject::as_f32_vec).unwrap();
    let c1 = function.get("C1").and_then(PdfObject::as_f32_vec).unwrap();
    assert_eq!(c0, vec![1.0, 1.0, 1.0]);
    assert_eq!(c1, vec![0.0, 0.0, 0.0]);
    assert_eq!(
        function.get("Domain").and_then(PdfObject::as_f32_vec),
        Some(vec![0.0, 1.0])
    );

    // exponential interpolation with N = 1 at the midpoint
    let mid: Vec<f32> = c0.iter().zip(&c1).map(|(a, b)| a + 0.5 * (b - a)).collect();
    assert_eq!(mid, vec![0.5, 0.5, 0.5]);

    let pattern_dict = &c.doc.get(pattern).unwrap().dict;
    assert_eq!(
        pattern_dict.get("Matrix").and_then(PdfObject::as_f32_vec),
        Some(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    );
}

#[test]
fn sweep_perspective() {
    let c = compile_case("sweep-perspective");
    let pattern = c.patterns[0].1.expect("projective sweep compiles");
    let pattern_dict = &c.doc.get(pattern).unwrap().dict;
    let affine: [f32; 6] = pattern_dict
        .get("Matrix")
        .and_then(PdfObject::as_f32_vec)
        .and_then(|v| v.try_into().ok())
        .expect("six-number pattern matrix");
    let affine = Matrix::from_affine(affine);

    let shading = shading_of(&c.doc, pattern);
    assert_eq!(
        shading.get("ShadingType").and_then(PdfObject::as_i64),
        Some(1)
    );
    let program = function_of(&c.doc, &shading).stream_text().unwrap().to_string();

    let canvas = Matrix::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.002, 0.001, 1.0]);
    let stops = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    for device in [Point::new(80.0, 60.0), Point::new(10.0, 90.0), Point::new(30.0, 5.0)] {
        // pattern-space input the viewer would feed the function
        let q = affine.invert().unwrap().map_point(device);
        let got = validation::evaluate_program(&program, &[q.x, q.y]).unwrap();

        let local = canvas.invert().unwrap().map_point(device);
        let (ux, uy) = (local.x - 50.0, local.y - 50.0);
        let mut degrees = uy.atan2(ux).to_degrees();
        if degrees < 0.0 {
            degrees += 360.0;
        }
        let t = degrees / 360.0;
        let (a, b, f) = if t <= 0.5 {
            (stops[0], stops[1], t / 0.5)
        } else {
            (stops[1], stops[2], (t - 0.5) / 0.5)
        };
        for i in 0..3 {
            let expected = a[i] + f * (b[i] - a[i]);
            assert!(
                (got[i] - expected).abs() < 5e-3,
                "device {device:?}: got {got:?}, expected channel {i} = {expected}"
            );
        }
    }
}

#[test]
fn translucent_radial() {
    let c = compile_case("translucent-radial");
    let pattern = c.patterns[0].1.expect("translucent radial compiles");
    let tiling = c.doc.get(pattern).unwrap();
    assert_eq!(
        tiling.dict.get("PatternType").and_then(PdfObject::as_i64),
        Some(1)
    );
    assert_eq!(
        tiling.dict.get("BBox").and_then(PdfObject::as_f32_vec),
        Some(vec![10.0, 10.0, 74.0, 74.0])
    );

    let resources = tiling.dict.get("Resources").and_then(PdfObject::as_dict).unwrap();
    let color = resources
        .get("Pattern")
        .and_then(PdfObject::as_dict)
        .and_then(|d| d.iter().next().and_then(|(_, v)| v.as_object_ref()))
        .unwrap();
    let shading = shading_of(&c.doc, color);
    assert_eq!(
        shading.get("ShadingType").and_then(PdfObject::as_i64),
        Some(3)
    );
    assert_eq!(
        shading.get("Coords").and_then(PdfObject::as_f32_vec),
        Some(vec![32.0, 32.0, 0.0, 32.0, 32.0, 32.0])
    );
    assert_eq!(
        c.doc.get(color).unwrap().dict.get("Matrix").and_then(PdfObject::as_f32_vec),
        Some(vec![1.0, 0.0, 0.0, 1.0, 10.0, 10.0])
    );
    let color_fn = &function_of(&c.doc, &shading).dict;
    assert_eq!(
        color_fn.get("C0"),
        color_fn.get("C1"),
        "color ramp is a solid after removing alpha"
    );

    // the mask ramp goes from opaque (white) to transparent (black)
    let luminosity_fn = c
        .doc
        .iter()
        .map(|(_, o)| &o.dict)
        .filter(|d| d.get("FunctionType").and_then(PdfObject::as_i64) == Some(2))
        .find(|d| d.get("C0") != d.get("C1"))
        .expect("luminosity ramp");
    assert_eq!(
        luminosity_fn.get("C0").and_then(PdfObject::as_f32_vec),
        Some(vec![1.0, 1.0, 1.0])
    );
    assert_eq!(
        luminosity_fn.get("C1").and_then(PdfObject::as_f32_vec),
        Some(vec![0.0, 0.0, 0.0])
    );

    let content = tiling.stream_text().unwrap();
    assert!(content.ends_with("10 10 64 64 re\nf*\n"), "{content}");
}

#[test]
fn shared_gradient() {
    let c = compile_case("shared-gradient");
    let first = c.patterns[0].1.expect("conical compiles");
    let second = c.patterns[1].1.expect("conical compiles");
    assert_eq!(first, second);
    assert_eq!(c.cache.len(), 1);
    // one calculator function and one pattern
    assert_eq!(c.doc.len(), 2);
}

#[test]
fn malformed_stops() {
    let c = compile_case("malformed-stops");
    assert!(c.patterns.iter().all(|(_, p)| p.is_none()));
    assert!(c.doc.is_empty());
    assert!(c.cache.is_empty());
}

#[test]
fn premultiplied_stops() {
    let c = compile_case("premultiplied-stops");

    // [0, 0, 0.5, 0.5] unpremultiplies to translucent blue
    let fade = c.patterns[0].1.expect("translucent ramp compiles");
    let tiling = &c.doc.get(fade).unwrap().dict;
    assert_eq!(
        tiling.get("PatternType").and_then(PdfObject::as_i64),
        Some(1)
    );
    let color_ramp = c
        .doc
        .iter()
        .map(|(_, o)| &o.dict)
        .filter(|d| d.get("FunctionType").and_then(PdfObject::as_i64) == Some(2))
        .find(|d| d.get("C0").and_then(PdfObject::as_f32_vec) == Some(vec![1.0, 0.0, 0.0]))
        .expect("opaque color ramp");
    assert_eq!(
        color_ramp.get("C1").and_then(PdfObject::as_f32_vec),
        Some(vec![0.0, 0.0, 1.0])
    );

    let solid = c.patterns[1].1.expect("opaque ramp compiles");
    let shading = shading_of(&c.doc, solid);
    assert_eq!(
        shading.get("ShadingType").and_then(PdfObject::as_i64),
        Some(2)
    );
    let function = &function_of(&c.doc, &shading).dict;
    assert_eq!(
        function.get("C0").and_then(PdfObject::as_f32_vec),
        Some(vec![0.0, 1.0, 0.0])
    );
    assert_eq!(
        function.get("C1").and_then(PdfObject::as_f32_vec),
        Some(vec![0.0, 0.0, 1.0])
    );
}
