fn main() {
    // Propagate the ESP-IDF build environment when cross-compiling for the
    // target. Host builds (tests, simulation) need none of it.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
