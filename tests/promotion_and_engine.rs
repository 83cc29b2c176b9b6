mod common;

use common::{ScriptedEngine, client_at, position};
use endgame_client::{
    Notice, SessionError,
    position::{Algorithm, Analysis, MateInfo, MovePrefix, PlayerMove, Position},
    remote::SolveReply,
    session::{Actor, turn_side},
};
use shakmaty::{Color, Role, Square};

const PAWN_ON_SEVENTH: &str = "k7/4P3/8/8/8/8/8/4K3 w - - 0 1";
const PROMOTED: &str = "k3Q3/8/8/8/8/8/8/4K3 b - - 0 1";

fn pawn_on_seventh() -> Position {
    position(
        PAWN_ON_SEVENTH,
        &[("white_king", "e1"), ("white_pawn", "e7"), ("black_king", "a8")],
    )
}

fn promoted() -> Position {
    position(
        PROMOTED,
        &[("white_king", "e1"), ("white_queen", "e8"), ("black_king", "a8")],
    )
}

fn e7e8() -> MovePrefix {
    MovePrefix {
        from: Square::E7,
        to: Square::E8,
    }
}

#[tokio::test]
async fn pawn_to_last_rank_waits_for_a_piece_then_commits_once() {
    let engine = ScriptedEngine::new();
    engine.on_legal_moves(Square::E7, &[Square::E8]);
    engine.on_move(Ok(promoted()));
    let mut client = client_at(&engine, Color::White, pawn_on_seventh()).await;

    let query = client.click(Square::E7).unwrap().unwrap();
    client.complete(query.await).unwrap();
    let calls_before = engine.calls().len();

    assert!(client.click(Square::E8).unwrap().is_none());
    assert!(client.session().is_awaiting_promotion());
    assert_eq!(
        client.session().pending_promotion().unwrap().actor,
        Actor::Human
    );
    assert_eq!(engine.calls().len(), calls_before);

    // nothing else may touch the position meanwhile
    assert_eq!(
        client.select_square(Square::E1).err(),
        Some(SessionError::PromotionPending)
    );
    assert_eq!(client.randomize().err(), Some(SessionError::PromotionPending));
    assert_eq!(
        client
            .submit_move(PlayerMove::new(Square::E1, Square::D1))
            .err(),
        Some(SessionError::PromotionPending)
    );

    let submit = client.complete_promotion(Role::Queen).unwrap();
    assert_eq!(client.complete(submit.await), Ok(Notice::Applied));

    let session = client.session();
    assert!(!session.is_awaiting_promotion());
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.position().unwrap().record().as_str(), PROMOTED);
    assert_eq!(engine.calls().last().unwrap(), "submit_move e7e8q");
}

#[tokio::test]
async fn cancelling_a_promotion_keeps_position_and_selection() {
    let engine = ScriptedEngine::new();
    engine.on_legal_moves(Square::E7, &[Square::E8]);
    let mut client = client_at(&engine, Color::White, pawn_on_seventh()).await;

    let query = client.click(Square::E7).unwrap().unwrap();
    client.complete(query.await).unwrap();
    let before = client.session().clone();

    client.attempt_move(Square::E7, Square::E8).unwrap();
    client.cancel_promotion().unwrap();

    let session = client.session();
    assert!(!session.is_awaiting_promotion());
    assert_eq!(session.position(), before.position());
    assert_eq!(session.selected(), Some(Square::E7));
    assert_eq!(session.legal_moves(), &[Square::E8]);
    assert_eq!(session.history().len(), 1);

    assert!(matches!(
        client.cancel_promotion(),
        Err(SessionError::Validation(_))
    ));
}

#[tokio::test]
async fn rejected_promotion_stays_pending_for_another_choice() {
    let engine = ScriptedEngine::new();
    engine.on_legal_moves(Square::E7, &[Square::E8]);
    engine.on_move(Err(SessionError::rejected("Failed to apply move")));
    let mut client = client_at(&engine, Color::White, pawn_on_seventh()).await;

    let query = client.click(Square::E7).unwrap().unwrap();
    client.complete(query.await).unwrap();
    client.click(Square::E8).unwrap();

    let submit = client.complete_promotion(Role::Knight).unwrap();
    assert!(client.complete(submit.await).is_err());
    assert!(client.session().is_awaiting_promotion());
    assert_eq!(client.session().history().len(), 1);
    assert!(!client.session().is_busy());

    assert!(matches!(
        client.complete_promotion(Role::King),
        Err(SessionError::Validation(_))
    ));
}

#[tokio::test]
async fn engine_moves_only_on_its_turn() {
    let engine = ScriptedEngine::new();
    let black_to_move = position(
        "8/8/8/8/8/8/4P3/k3K3 b - - 0 1",
        &[("white_king", "e1"), ("white_pawn", "e2"), ("black_king", "a1")],
    );
    let mut client = client_at(&engine, Color::Black, black_to_move).await;
    let calls_before = engine.calls().len();

    assert_eq!(
        client.request_engine_move(Algorithm::Mabp).err(),
        Some(SessionError::TurnViolation {
            expected: Color::Black,
            actual: Color::White
        })
    );
    assert_eq!(engine.calls().len(), calls_before);
}

#[tokio::test]
async fn engine_move_commits_with_its_analysis() {
    let engine = ScriptedEngine::new();
    let white_to_move = position(
        "8/8/8/8/8/8/4P3/k3K3 w - - 0 1",
        &[("white_king", "e1"), ("white_pawn", "e2"), ("black_king", "a1")],
    );
    let after = position(
        "8/8/8/8/4P3/8/8/k3K3 b - - 0 1",
        &[("white_king", "e1"), ("white_pawn", "e4"), ("black_king", "a1")],
    );
    engine.on_solve(Ok(SolveReply::Moved {
        mv: "e2e4".parse().unwrap(),
        position: after,
        analysis: Some(Analysis {
            evaluation: Some(150.0),
            depth: Some(5),
            ..Analysis::default()
        }),
    }));
    let mut client = client_at(&engine, Color::Black, white_to_move).await;

    let solve = client.request_engine_move(Algorithm::IterativeDeepening).unwrap();
    assert!(client.session().is_busy());
    assert_eq!(client.complete(solve.await), Ok(Notice::Applied));

    let session = client.session();
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.analysis().unwrap().depth, Some(5));
    assert_eq!(session.algorithm(), Some(Algorithm::IterativeDeepening));
    assert!(client.gate().is_human_turn(session));
    assert_eq!(engine.calls().last().unwrap(), "solve iterative_deepening");
}

#[tokio::test]
async fn engine_promotion_goes_back_through_the_solver() {
    let engine = ScriptedEngine::new();
    engine.on_solve(Ok(SolveReply::PromotionRequired {
        prefix: e7e8(),
        analysis: None,
    }));
    engine.on_solve(Ok(SolveReply::Moved {
        mv: e7e8().with_promotion(Role::Queen),
        position: promoted(),
        analysis: Some(Analysis {
            promotion: true,
            ..Analysis::default()
        }),
    }));
    let mut client = client_at(&engine, Color::Black, pawn_on_seventh()).await;

    let solve = client.request_engine_move(Algorithm::Mabp).unwrap();
    assert_eq!(
        client.complete(solve.await),
        Ok(Notice::PromotionRequired(e7e8()))
    );
    let pending = *client.session().pending_promotion().unwrap();
    assert_eq!(pending.actor, Actor::Engine);
    assert_eq!(client.session().history().len(), 1);

    let finish = client.complete_promotion(Role::Queen).unwrap();
    assert_eq!(client.complete(finish.await), Ok(Notice::Applied));

    let session = client.session();
    assert!(!session.is_awaiting_promotion());
    assert_eq!(session.history().len(), 2);
    assert!(session.analysis().unwrap().promotion);
    assert_eq!(engine.calls().last().unwrap(), "solve mabp e7e8q");
}

#[tokio::test]
async fn mate_report_without_a_move_only_updates_the_analysis() {
    let engine = ScriptedEngine::new();
    engine.on_solve(Ok(SolveReply::Analysed {
        analysis: Analysis {
            mate: true,
            mate_info: Some(MateInfo {
                mate_in: Some(3),
                for_side: Some("white".into()),
                winner: Some("white".into()),
                status: "White mates in 3".into(),
            }),
            ..Analysis::default()
        },
    }));
    let mut client = client_at(&engine, Color::Black, pawn_on_seventh()).await;
    let before = client.session().clone();

    let solve = client.request_engine_move(Algorithm::Mabp).unwrap();
    assert_eq!(client.complete(solve.await), Ok(Notice::Analysed));

    let session = client.session();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.position(), before.position());
    assert_eq!(turn_side(session.position().unwrap()), Color::White);
    assert!(!session.is_busy());
    let analysis = session.analysis().unwrap();
    assert!(analysis.mate);
    assert_eq!(analysis.mate_info.as_ref().unwrap().mate_in, Some(3));
}

fn game_over() -> SolveReply {
    SolveReply::GameOver {
        reason: Some("checkmate".into()),
        winner: Some("white".into()),
        analysis: Analysis {
            game_over: true,
            game_over_reason: Some("checkmate".into()),
            ..Analysis::default()
        },
    }
}

#[tokio::test]
async fn game_over_offers_a_reset_without_forcing_it() {
    let engine = ScriptedEngine::new();
    engine.on_solve(Ok(game_over()));
    let mut client = client_at(&engine, Color::Black, pawn_on_seventh()).await;

    let solve = client.request_engine_move(Algorithm::Mcts).unwrap();
    let notice = client.complete(solve.await).unwrap();

    assert_eq!(
        notice,
        Notice::GameOver {
            reason: Some("checkmate".into()),
            winner: Some("white".into()),
            reset: false
        }
    );
    assert!(client.session().position().is_some());
    assert!(client.session().analysis().unwrap().game_over);
}

#[tokio::test]
async fn accepted_reset_offer_clears_the_game() {
    let engine = ScriptedEngine::new();
    engine.on_solve(Ok(game_over()));
    let mut client = client_at(&engine, Color::Black, pawn_on_seventh())
        .await
        .with_confirm(|_: &str| true);

    let solve = client.request_engine_move(Algorithm::Mcts).unwrap();
    let notice = client.complete(solve.await).unwrap();

    assert!(matches!(notice, Notice::GameOver { reset: true, .. }));
    assert!(client.session().position().is_none());
    assert!(client.session().history().is_empty());
    assert_eq!(client.session().algorithm(), Some(Algorithm::Mcts));
}

#[tokio::test]
async fn replay_is_read_only_until_committed() {
    let engine = ScriptedEngine::new();
    engine.on_solve(Ok(SolveReply::Moved {
        mv: e7e8().with_promotion(Role::Queen),
        position: promoted(),
        analysis: None,
    }));
    let mut client = client_at(&engine, Color::Black, pawn_on_seventh()).await;
    let solve = client.request_engine_move(Algorithm::Pvs).unwrap();
    client.complete(solve.await).unwrap();
    assert_eq!(client.session().history().len(), 2);

    let replay = client.replay(0).unwrap();
    assert_eq!(client.complete(replay.await), Ok(Notice::Applied));

    let session = client.session();
    let view = session.replay().unwrap();
    assert_eq!(view.index, 0);
    assert_eq!(view.position.record().as_str(), PAWN_ON_SEVENTH);
    assert_eq!(session.position().unwrap().record().as_str(), PROMOTED);
    assert_eq!(
        engine.calls().last().unwrap(),
        &format!("parse {PAWN_ON_SEVENTH}")
    );

    assert!(matches!(
        client.commit_replay(1),
        Err(SessionError::Validation(_))
    ));
    client.commit_replay(0).unwrap();

    let session = client.session();
    assert_eq!(session.position().unwrap().record().as_str(), PAWN_ON_SEVENTH);
    assert_eq!(session.history().len(), 2);
    assert!(session.replay().is_none());
    assert!(client.replay(5).is_err());
}

#[tokio::test]
async fn closing_a_replay_returns_to_the_live_board() {
    let engine = ScriptedEngine::new();
    let mut client = client_at(&engine, Color::Black, pawn_on_seventh()).await;

    let replay = client.replay(0).unwrap();
    client.complete(replay.await).unwrap();
    assert!(client.session().replay().is_some());

    client.close_replay();
    assert!(client.session().replay().is_none());
    assert_eq!(
        client.session().position().unwrap().record().as_str(),
        PAWN_ON_SEVENTH
    );

    // closing twice is harmless
    client.close_replay();
    assert!(client.commit_replay(0).is_err());
}
