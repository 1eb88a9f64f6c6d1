fn main() -> Result<(), Box<dyn std::error::Error>> {
    jdkstore_cli::run()
}
