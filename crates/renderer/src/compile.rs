use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the static full-screen quad vertex shader.
///
/// Validation failures surface through the caller's error scope, never as a
/// panic, so this returns the module handle unconditionally.
pub(crate) fn create_vertex_module(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen quad vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Wraps the user fragment source with the playground prelude and compiles
/// it as GLSL.
pub(crate) fn create_fragment_module(device: &wgpu::Device, source: &str) -> wgpu::ShaderModule {
    let wrapped = wrap_playground_fragment(source);
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("playground fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Produces a self-contained Vulkan-GLSL fragment shader from playground
/// dialect source.
///
/// Editors feed this the WebGL-flavoured shaders people paste around:
/// `uniform float time;` declarations, `precision` qualifiers, writes to
/// `gl_FragColor`. The prelude supplies `time` and `resolution` from the
/// frame uniform block instead, so redeclarations and `#version` lines are
/// stripped before prepending [`HEADER`]. `#line 1` keeps compiler logs
/// pointing at the user's own line numbers.
pub(crate) fn wrap_playground_fragment(source: &str) -> String {
    let mut skipped_version = false;
    let mut sanitized = String::new();
    for line in source.lines() {
        let trimmed = line.trim_start();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            continue;
        }
        if trimmed.starts_with("precision ") {
            continue;
        }
        let redeclares_builtin = trimmed.starts_with("uniform ")
            && (trimmed.contains("time") || trimmed.contains("resolution"));
        if redeclares_builtin {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }

    format!("{HEADER}\n#line 1\n{sanitized}")
}

/// GLSL prologue injected ahead of every playground fragment shader.
///
/// The uniform block layout must match `FrameParams` in `gpu/uniforms.rs`.
/// `gl_FragColor` is mapped onto the location-0 output so WebGL-style
/// shaders compile unchanged under the naga frontend.
const HEADER: &str = r"#version 450
layout(location = 0) out vec4 fraglab_frag_color;

layout(std140, set = 0, binding = 0) uniform FrameParams {
    vec2 _resolution;
    float _time;
    float _pad0;
} frame;

#define resolution frame._resolution
#define time frame._time
#define gl_FragColor fraglab_frag_color
";

/// Minimal vertex shader for the 4-vertex full-screen triangle strip.
///
/// The `position` attribute is fed straight from the quad vertex buffer
/// uploaded at context initialisation; no transform is applied.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;

void main() {
    gl_Position = vec4(position, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_version_and_precision() {
        let source = "#version 100\nprecision mediump float;\nvoid main() { gl_FragColor = vec4(1.0); }\n";
        let wrapped = wrap_playground_fragment(source);
        assert!(!wrapped.contains("#version 100"));
        assert!(!wrapped.contains("precision mediump"));
        assert!(wrapped.contains("void main()"));
    }

    #[test]
    fn wrap_strips_redeclared_uniforms() {
        let source = "uniform float time;\nuniform vec2 resolution;\nvoid main() { gl_FragColor = vec4(sin(time)); }\n";
        let wrapped = wrap_playground_fragment(source);
        assert!(!wrapped.contains("uniform float time"));
        assert!(!wrapped.contains("uniform vec2 resolution"));
        // The macro aliases still make both names usable.
        assert!(wrapped.contains("#define time frame._time"));
        assert!(wrapped.contains("#define resolution frame._resolution"));
    }

    #[test]
    fn wrap_realigns_line_numbers() {
        let wrapped = wrap_playground_fragment("void main() { gl_FragColor = vec4(0.0); }");
        let header_end = wrapped.find("#line 1").expect("line directive present");
        assert!(wrapped[header_end..].contains("void main()"));
    }

    #[test]
    fn wrap_keeps_user_declarations() {
        let source = "uniform float speed;\nvoid main() { gl_FragColor = vec4(speed); }\n";
        let wrapped = wrap_playground_fragment(source);
        assert!(wrapped.contains("uniform float speed;"));
    }
}
