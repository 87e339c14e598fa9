use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    // riscv-rt's link.x includes memory.x from the search path
    let out = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::copy("memory.x", out.join("memory.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");
    Ok(())
}
