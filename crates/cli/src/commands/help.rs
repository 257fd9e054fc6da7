pub fn is_help_request(args: &[String]) -> bool {
    matches!(
        args.first().map(String::as_str),
        Some("help" | "-h" | "--help")
    )
}

pub fn print_help() {
    println!("tabload_cli - CSV to relational table loader");
    println!();
    println!("usage:");
    println!("  tabload_cli load <request.json>");
    println!("  tabload_cli ping <request.json>");
    println!("  tabload_cli tables <request.json>");
    println!("  tabload_cli schema <request.json> <table_name>");
    println!("  tabload_cli help");
    println!();
    println!("example:");
    println!("  tabload_cli load ./mocks/request.json");
}
