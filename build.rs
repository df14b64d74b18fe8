// Compiles the GLSL shaders in assets/shaders to SPIR-V next to their sources.

use std::path::Path;
use std::process::Command;

const SHADER_DIR: &str = "assets/shaders";
const SHADERS: [&str; 3] = ["tri.vert", "tri_mesh.vert", "mesh.frag"];

fn main() {
    println!("cargo:rerun-if-changed={}", SHADER_DIR);

    for shader in SHADERS {
        let input = Path::new(SHADER_DIR).join(shader);
        let output = Path::new(SHADER_DIR).join(format!("{}.spv", shader));
        compile_shader(&input, &output);
    }
}

fn compile_shader(input: &Path, output: &Path) {
    // glslc ships with the Vulkan SDK and the Android NDK
    let result = Command::new("glslc").arg(input).arg("-o").arg(output).status();

    match result {
        Ok(status) if status.success() => {}
        Ok(status) => {
            panic!("Failed to compile {}: exit code {:?}", input.display(), status.code());
        }
        Err(e) => {
            println!("cargo:warning=glslc not found ({}), {} was not compiled", e, input.display());
            println!("cargo:warning=  glslc {} -o {}", input.display(), output.display());
        }
    }
}
