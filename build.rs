fn main() {
    // Host builds (tests, fuzzing) carry no ESP-IDF toolchain; only the
    // firmware build needs the linker arguments from the IDF environment.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
