//! rvariant-perft
//!
//! 指定したルールと局面で perft を数え、手順適用後の局面と終局判定を表示する。
//!
//! ```text
//! rvariant-perft --variant crazyhouse --depth 3
//! rvariant-perft --config my_variant.toml --fen "..." --moves e2e4,e7e5 --divide --depth 2
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;

use rvariant_core::movegen::{MoveList, divide, move_to_uci, parse_move, perft};
use rvariant_core::position::Position;
use rvariant_core::types::Value;
use rvariant_core::variant::{PRESET_NAMES, Variant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Perft and game-end report for chess variants")]
struct Cli {
    /// 組み込みルール名
    #[arg(long, default_value = "chess", conflicts_with = "config")]
    variant: String,

    /// ルール設定ファイル（TOML）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 開始局面（省略時はルールの初期局面）
    #[arg(long)]
    fen: Option<String>,

    /// Chess960 形式のキャスリング表記
    #[arg(long, default_value_t = false)]
    chess960: bool,

    /// perft の深さ（0 なら数えない）
    #[arg(long, default_value_t = 0)]
    depth: u32,

    /// 初手ごとの内訳を表示
    #[arg(long, default_value_t = false)]
    divide: bool,

    /// 開始局面から適用する手（空白またはカンマ区切り）
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    moves: Vec<String>,

    /// 盤面を表示
    #[arg(long, default_value_t = false)]
    show: bool,

    /// 組み込みルールの一覧を表示して終了
    #[arg(long, default_value_t = false)]
    list_variants: bool,
}

/// TOML のルール設定を読み込む
fn load_variant_file(path: &Path) -> Result<Variant> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_variant_toml(&text).with_context(|| format!("invalid variant config {}", path.display()))
}

fn parse_variant_toml(text: &str) -> Result<Variant> {
    let raw: Variant = toml::from_str(text)?;
    Ok(raw.conclude()?)
}

fn load_variant(cli: &Cli) -> Result<Variant> {
    match &cli.config {
        Some(path) => load_variant_file(path),
        None => Variant::preset(&cli.variant).map_err(|e| anyhow!("{e} (available: {})", PRESET_NAMES.join(", "))),
    }
}

/// 手順を 1 手ずつ合法性を確かめながら進める
fn apply_moves(pos: &mut Position, moves: &[String]) -> Result<()> {
    for text in moves.iter().flat_map(|m| m.split_whitespace()) {
        let m = parse_move(pos, text).with_context(|| format!("at ply {}", pos.game_ply()))?;
        let gives_check = pos.gives_check(m);
        pos.do_move(m, gives_check);
        log::debug!("played {text}: {}", pos.fen());
    }
    Ok(())
}

fn describe_result(v: Value) -> String {
    if v == Value::DRAW {
        "draw".to_string()
    } else if v.is_win() {
        format!("side to move wins ({v})")
    } else if v.is_loss() {
        format!("side to move loses ({v})")
    } else {
        format!("{v}")
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.list_variants {
        for name in PRESET_NAMES {
            println!("{name}");
        }
        return Ok(());
    }
    if cli.divide && cli.depth == 0 {
        bail!("--divide requires --depth >= 1");
    }

    rvariant_core::init();
    let variant = Arc::new(load_variant(&cli)?);
    log::info!("variant: {}", variant.name);

    let mut pos = match &cli.fen {
        Some(fen) => Position::set(Arc::clone(&variant), fen, cli.chess960).context("failed to parse --fen")?,
        None => Position::startpos(Arc::clone(&variant)).context("failed to parse the start position")?,
    };
    apply_moves(&mut pos, &cli.moves)?;

    // 書き出した FEN が同じ局面に戻ること
    let fen = pos.fen();
    let reparsed = Position::set(Arc::clone(&variant), &fen, pos.is_chess960()).context("FEN round trip failed")?;
    if reparsed.key() != pos.key() {
        bail!("FEN round trip changed the position key: {fen}");
    }

    if cli.show {
        println!("{pos}");
    }
    println!("fen: {fen}");
    println!("legal moves: {}", MoveList::legal(&pos).len());

    if let Some(v) = pos.is_immediate_game_end(0) {
        println!("immediate game end: {}", describe_result(v));
    }
    if let Some(v) = pos.is_optional_game_end(0, 0) {
        println!("optional game end: {}", describe_result(v));
    }

    if cli.depth > 0 {
        let start = Instant::now();
        let nodes = if cli.divide {
            let mut total = 0;
            for (m, n) in divide(&mut pos, cli.depth) {
                println!("{}: {n}", move_to_uci(&pos, m));
                total += n;
            }
            println!();
            total
        } else {
            perft(&mut pos, cli.depth)
        };
        let elapsed = start.elapsed();
        let nps = (nodes as f64 / elapsed.as_secs_f64().max(1e-9)) as u64;
        println!("perft({}) = {nodes}", cli.depth);
        log::info!("{:.3}s, {nps} nps", elapsed.as_secs_f64());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variant_toml_defaults_to_chess() {
        rvariant_core::init();
        let var = parse_variant_toml("name = \"plain\"\n").unwrap();
        let pos = Position::startpos(Arc::new(var)).unwrap();
        assert_eq!(pos.fen(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(MoveList::legal(&pos).len(), 20);
    }

    #[test]
    fn test_parse_variant_toml_flag_rule() {
        rvariant_core::init();
        let text = r#"
name = "hill"
flag_piece_white = "king"
flag_piece_black = "king"
flag_region_white = "d4 e4 d5 e5"
flag_region_black = "d4 e4 d5 e5"
"#;
        let var = Arc::new(parse_variant_toml(text).unwrap());
        let pos = Position::set(var, "4k3/8/8/8/4K3/8/8/8 b - - 0 1", false).unwrap();
        assert_eq!(pos.is_immediate_game_end(0), Some(Value::mated_in(0)));
    }

    #[test]
    fn test_parse_variant_toml_rejects_unknown_value() {
        assert!(parse_variant_toml("stalemate_value = \"maybe\"\n").is_err());
    }

    #[test]
    fn test_apply_moves_accepts_both_separators() {
        rvariant_core::init();
        let mut pos = Position::startpos(Arc::new(Variant::preset("chess").unwrap())).unwrap();
        apply_moves(&mut pos, &["e2e4 e7e5".to_string(), "g1f3".to_string()]).unwrap();
        assert_eq!(pos.fen(), "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");
        assert!(apply_moves(&mut pos, &["e2e4".to_string()]).is_err());
    }

    #[test]
    fn test_describe_result() {
        assert_eq!(describe_result(Value::DRAW), "draw");
        assert!(describe_result(Value::mate_in(2)).starts_with("side to move wins"));
        assert!(describe_result(Value::mated_in(0)).starts_with("side to move loses"));
    }
}
