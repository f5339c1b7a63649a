fn main() {
    // ESP-IDF linker/sysenv wiring is only needed for firmware images.
    // Host builds (tests, fuzz) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
