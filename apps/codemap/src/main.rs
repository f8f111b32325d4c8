use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = codemap::Args::parse();

	codemap::run(args).await
}
