use xiast_chess::{
    legal_destinations, legal_moves, make_move, new_game, status, ChessError, Color, Game,
    GameStatus, RandomPolicy, Square, Board,
};

fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

fn play(board: &Board, moves: &[(&str, &str)]) -> Board {
    moves.iter().fold(board.clone(), |board, (from, to)| {
        make_move(&board, sq(from), sq(to), None).unwrap()
    })
}

#[test]
fn starting_position_has_twenty_moves() {
    let board = new_game();
    assert_eq!(legal_moves(&board).len(), 20);
    assert_eq!(status(&board), GameStatus::InProgress);
}

#[test]
fn fools_mate() {
    let board = new_game();
    let board = play(&board, &[("f2", "f3"), ("e7", "e5"), ("g2", "g4")]);
    assert_eq!(status(&board), GameStatus::InProgress);
    let board = play(&board, &[("d8", "h4")]);
    assert_eq!(status(&board), GameStatus::Checkmate(Color::Black));
    assert!(legal_moves(&board).is_empty());
}

#[test]
fn scholars_mate_is_won_by_white() {
    let board = play(&new_game(), &[
        ("e2", "e4"), ("e7", "e5"),
        ("f1", "c4"), ("b8", "c6"),
        ("d1", "h5"), ("g8", "f6"),
        ("h5", "f7"),
    ]);
    assert_eq!(status(&board), GameStatus::Checkmate(Color::White));
}

#[test]
fn a_check_is_reported() {
    let board = play(&new_game(), &[("e2", "e4"), ("f7", "f6"), ("d1", "h5")]);
    assert_eq!(status(&board), GameStatus::Check(Color::Black));
}

#[test]
fn illegal_move_leaves_the_board_alone() {
    let board = new_game();
    let before = board.clone();
    for (from, to) in [("e2", "e5"), ("e7", "e5"), ("g1", "g3"), ("e1", "e2"), ("a3", "a4")] {
        let result = make_move(&board, sq(from), sq(to), None);
        assert!(matches!(result, Err(ChessError::IllegalMove { .. })), "{from}{to} accepted");
        assert_eq!(board, before);
    }
}

#[test]
fn bare_kings_are_a_draw_for_either_side_to_move() {
    for fen in ["8/8/3k4/8/8/3K4/8/8 w - - 0 1", "8/8/3k4/8/8/3K4/8/8 b - - 0 1"] {
        let board: Board = fen.parse().unwrap();
        assert_eq!(status(&board), GameStatus::DrawByInsufficientMaterial);
    }
}

#[test]
fn knight_shuffle_repeats_three_times() {
    let mut game = Game::new(Color::White, Box::new(RandomPolicy::seeded(0)));
    let shuffle = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];
    for (from, to) in shuffle {
        game.make_move(sq(from), sq(to), None).unwrap();
    }
    // the starting position has now been seen twice
    assert_eq!(game.status(), GameStatus::InProgress);
    for (i, (from, to)) in shuffle.iter().enumerate() {
        game.make_move(sq(from), sq(to), None).unwrap();
        if i < 3 {
            assert!(!game.status().is_over(), "drawn early after {from}{to}");
        }
    }
    assert_eq!(game.status(), GameStatus::DrawByRepetition);
    // the facade sees no history, so the same board is still in progress
    assert_eq!(status(game.board()), GameStatus::InProgress);
}

#[test]
fn promotion_through_the_facade() {
    let board: Board = "4k3/1P6/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
    let queened = make_move(&board, sq("b7"), sq("b8"), None).unwrap();
    assert_eq!(queened.piece_at(sq("b8")).map(|p| p.symbol()), Some('Q'));
    let knighted = make_move(&board, sq("b7"), sq("b8"), Some(xiast_chess::PieceKind::Knight)).unwrap();
    assert_eq!(knighted.piece_at(sq("b8")).map(|p| p.symbol()), Some('N'));
}

#[test]
fn destinations_follow_the_side_to_move() {
    let board = new_game();
    let pawn: Vec<String> = legal_destinations(&board, sq("e2")).iter().map(|s| s.to_string()).collect();
    assert_eq!(pawn, vec!["e3", "e4"]);
    assert!(legal_destinations(&board, sq("e7")).is_empty());

    let board = play(&board, &[("e2", "e4")]);
    assert_eq!(legal_destinations(&board, sq("e7")).len(), 2);
    assert!(legal_destinations(&board, sq("d2")).is_empty());
}

#[test]
fn maximal_counters_do_not_break_the_facade() {
    let board: Board = "4k3/8/8/8/8/8/8/4K2R w - - 4294967295 1".parse().unwrap();
    assert_eq!(status(&board), GameStatus::DrawByFiftyMoves);
    let after = make_move(&board, sq("h1"), sq("h2"), None).unwrap();
    assert_eq!(after.halfmove_clock(), u32::MAX);

    let board: Board = "4k3/8/8/8/8/8/8/4K2R b - - 0 4294967295".parse().unwrap();
    let after = make_move(&board, sq("e8"), sq("d8"), None).unwrap();
    assert_eq!(after.fullmove_number(), u32::MAX);
    assert_eq!(status(&after), GameStatus::InProgress);
}
