/// WGSL matcap shader: view-space normal picks a texel from the lit sphere.
pub const MATCAP_SHADER: &str = r#"
struct Uniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@group(1) @binding(0)
var matcap: texture_2d<f32>;
@group(1) @binding(1)
var matcap_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_dir: vec3<f32>,
    @location(1) view_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let model_view = uniforms.view * model;
    let view_pos = model_view * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.proj * view_pos;
    out.view_dir = -view_pos.xyz;
    // Scale is uniform, so the model-view matrix keeps normals perpendicular.
    out.view_normal = (model_view * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = instance.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(in.view_normal);
    let view_dir = normalize(in.view_dir);
    let x = normalize(vec3<f32>(view_dir.z, 0.0, -view_dir.x));
    let y = cross(view_dir, x);
    let uv = vec2<f32>(dot(x, normal), dot(y, normal)) * 0.495 + 0.5;
    // Texture rows run top to bottom.
    let texel = textureSample(matcap, matcap_sampler, vec2<f32>(uv.x, 1.0 - uv.y));
    return vec4<f32>(texel.rgb * in.color.rgb, texel.a * in.color.a);
}
"#;
