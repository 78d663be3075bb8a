// Generates Swift/Kotlin bindings from the built `shopfloor_core` library:
// cargo run -p uniffi-bindgen -- generate --library <libshopfloor_core> --language swift --out-dir <dir>
fn main() {
    uniffi::uniffi_bindgen_main()
}
