use apimon::error::AppResult;

fn main() -> AppResult<()> {
    apimon::run()
}
