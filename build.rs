fn main() {
    // Only the firmware build needs the ESP-IDF environment; host builds of
    // the library and its tests skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
