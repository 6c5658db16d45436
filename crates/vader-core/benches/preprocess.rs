use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vader_core::{UniformKind, UniformLength, UniformSet, infer_uniform_type, preprocess, registry};

const SOURCE: &str = r#"
#define OCTAVES VADER_STATIC(OCTAVES, 4)
#define GAIN VADER_STATIC(GAIN, 0.5)
uniform vec2 u_resolution;
uniform float u_time;
uniform sampler2D u_noise;
uniform vec3 u_points[8];

float fbm(vec2 p) {
    float v = 0.0;
    float a = STATIC(AMP, 0.5);
    for (int i = 0; i < OCTAVES; i++) {
        v += a * texture2D(u_noise, p).r;
        p *= 2.0;
        a *= GAIN;
    }
    return v;
}

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution;
    gl_FragColor = vec4(vec3(fbm(uv + u_time)), STATIC(ALPHA, 1.0));
}
"#;

fn statics() -> UniformSet {
    let mut set = UniformSet::new();
    for (name, value) in [("OCTAVES", "6"), ("GAIN", "0.45")] {
        let uniform = registry::create(UniformKind::StaticMacro, None, UniformLength::Single, value)
            .expect("static uniform");
        set.insert(name, uniform);
    }
    set
}

fn bench_preprocess(c: &mut Criterion) {
    let uniforms = statics();
    c.bench_function("preprocess_statics", |b| {
        b.iter(|| preprocess(black_box(SOURCE), black_box(&uniforms)))
    });

    let empty = UniformSet::new();
    c.bench_function("preprocess_inline_defaults", |b| {
        b.iter(|| preprocess(black_box(SOURCE), black_box(&empty)))
    });
}

fn bench_inference(c: &mut Criterion) {
    c.bench_function("infer_uniform_types", |b| {
        b.iter(|| {
            for name in ["u_resolution", "u_time", "u_noise", "u_points", "OCTAVES", "u_missing"] {
                black_box(infer_uniform_type(black_box(name), SOURCE));
            }
        })
    });
}

criterion_group!(benches, bench_preprocess, bench_inference);
criterion_main!(benches);
