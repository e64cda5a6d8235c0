fn main() {
    // Bindings come from proc-macros in src/uniffi_bindings.rs; nothing is
    // generated here beyond the rebuild triggers.
    println!("cargo:rerun-if-changed=src/uniffi_bindings.rs");
    println!("cargo:rerun-if-changed=build.rs");
}
