fn main() {
    if let Err(err) = wellbeing_merge::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
