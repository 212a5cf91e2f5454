fn main() {
    if let Err(e) = careslot_lib::run() {
        eprintln!("careslot: {e}");
        std::process::exit(1);
    }
}
