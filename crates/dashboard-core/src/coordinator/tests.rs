use std::sync::Arc;

use dashboard_db::Database;

use super::*;
use crate::entity::EntityStatus;
use crate::testing::{
    FailingPersistence, FakeTransport, LogCapture, MemoryPersistence, heroes_json, league_json, match_json,
    player_json, team_json,
};

const TEAM: &str = "teams/100?leagueId=5";
const ROSTER: [u64; 5] = [11, 12, 13, 14, 15];

fn coordinator(transport: &Arc<FakeTransport>, persistence: Arc<dyn Persistence>) -> DataCoordinator {
    DataCoordinator::new(transport.clone(), persistence, FirstLoadFailure::Keep)
}

fn in_memory(transport: &Arc<FakeTransport>) -> DataCoordinator {
    coordinator(transport, Arc::new(MemoryPersistence::default()))
}

/// Team 100 in league 5 with matches 1 and 2. Team 100 plays radiant in
/// match 1 and does not appear in match 2.
fn serve_team_100(transport: &FakeTransport) {
    transport.ok(TEAM, team_json(100, "Team Spirit", &[1, 2]));
    transport.ok("leagues/5", league_json(5, "The International"));
    transport.ok("matches/1", match_json(1, 100, 200, &ROSTER, &[21, 22, 23, 24, 25]));
    transport.ok("matches/2", match_json(2, 300, 400, &[31], &[41]));
    for id in ROSTER {
        transport.ok(&format!("players/{id}"), player_json(id));
    }
}

async fn wait_for_call(transport: &FakeTransport, path: &str, count: usize) {
    while transport.calls_to(path) < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn add_team_loads_matches_and_own_side_players() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    let coordinator = in_memory(&transport);
    let logs = LogCapture::default();
    let _guard = logs.install();

    let outcome = coordinator.add_team(100, 5).await;
    assert_eq!(outcome, WorkflowOutcome::Completed);

    let output = logs.contents();
    let mismatch = output
        .lines()
        .find(|line| line.contains("Team is on neither side of match"))
        .expect("side mismatch warning");
    assert!(mismatch.contains("WARN"));
    assert!(mismatch.contains("match_id=2"));

    let status = coordinator.get_ui_status();
    assert!(!status.is_loading);
    assert_eq!(status.progress, 1.0);
    assert!(status.error.is_none());
    assert!(!status.can_retry);

    let team = coordinator.teams().get(TeamKey::new(100, 5)).unwrap();
    assert_eq!(team.status, EntityStatus::Ready);
    assert_eq!(team.players, ROSTER.to_vec());
    assert_eq!(team.matches.keys().copied().collect::<Vec<_>>(), vec![1]);
    assert_eq!(team.performance.overall.wins, 1);
    assert_eq!(team.performance.first_pick.wins, 1);

    assert_eq!(coordinator.matches().ids(), vec![1, 2]);
    assert_eq!(coordinator.players().ids(), ROSTER.to_vec());
    assert_eq!(transport.calls_to("players/21"), 0);
    assert_eq!(transport.calls_to("players/31"), 0);
}

#[tokio::test]
async fn workflow_status_counts_steps() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    let coordinator = in_memory(&transport);

    assert_eq!(coordinator.get_ui_status().progress, 0.0);
    coordinator.add_team(100, 5).await;

    let status = coordinator.workflow_status();
    assert_eq!(status.total_steps, 5);
    assert_eq!(status.current_step, 5);
    assert!(!status.running);
    assert_eq!(status.label.as_deref(), Some("Adding team 100:5"));
}

#[tokio::test]
async fn rapid_second_add_wins() {
    let transport = FakeTransport::new();
    transport.ok(TEAM, team_json(100, "Team Spirit", &[1]));
    transport.ok(TEAM, team_json(100, "Team Spirit", &[2]));
    transport.ok("leagues/5", league_json(5, "The International"));
    transport.ok("matches/1", match_json(1, 100, 200, &[11], &[21]));
    transport.ok("matches/2", match_json(2, 100, 200, &[12], &[22]));
    transport.ok("players/11", player_json(11));
    transport.ok("players/12", player_json(12));
    let gate = transport.gate(TEAM);
    let coordinator = in_memory(&transport);

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.add_team(100, 5).await }
    });
    wait_for_call(&transport, TEAM, 1).await;

    let second = coordinator.add_team(100, 5).await;
    assert_eq!(second, WorkflowOutcome::Completed);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), WorkflowOutcome::Superseded);

    let team = coordinator.teams().get(TeamKey::new(100, 5)).unwrap();
    assert_eq!(team.match_ids, vec![2]);
    assert_eq!(team.players, vec![12]);
    assert_eq!(transport.calls_to("matches/1"), 0);
    assert_eq!(coordinator.teams().len(), 1);
    assert_eq!(coordinator.get_ui_status().progress, 1.0);
}

#[tokio::test]
async fn failed_team_can_be_retried() {
    let transport = FakeTransport::new();
    transport.status(TEAM, 503, r#"{"error":"OpenDota unavailable"}"#);
    transport.ok(TEAM, team_json(100, "Team Spirit", &[]));
    transport.ok("leagues/5", league_json(5, "The International"));
    let coordinator = in_memory(&transport);

    assert_eq!(coordinator.add_team(100, 5).await, WorkflowOutcome::Failed);
    let status = coordinator.get_ui_status();
    assert_eq!(status.error.as_deref(), Some("OpenDota unavailable"));
    assert!(status.can_retry);

    let team = coordinator.teams().get(TeamKey::new(100, 5)).unwrap();
    assert_eq!(team.status, EntityStatus::Failed);

    assert_eq!(coordinator.retry().await, Some(WorkflowOutcome::Completed));
    let team = coordinator.teams().get(TeamKey::new(100, 5)).unwrap();
    assert_eq!(team.status, EntityStatus::Ready);
    assert!(team.error.is_none());
    assert!(coordinator.workflow_status().error.is_none());
}

#[tokio::test]
async fn retry_without_command_is_noop() {
    let transport = FakeTransport::new();
    let coordinator = in_memory(&transport);
    assert!(coordinator.retry().await.is_none());
}

#[tokio::test]
async fn errored_match_is_repopulated_by_refresh() {
    let transport = FakeTransport::new();
    transport.ok(TEAM, team_json(100, "Team Spirit", &[1]));
    transport.ok("leagues/5", league_json(5, "The International"));
    transport.status("matches/1", 500, "");
    transport.ok("matches/1", match_json(1, 100, 200, &[11], &[21]));
    transport.ok("players/11", player_json(11));
    let coordinator = in_memory(&transport);

    let outcome = coordinator.add_team(100, 5).await;
    assert_eq!(outcome, WorkflowOutcome::CompletedWithErrors);
    assert_eq!(coordinator.matches().get(1).unwrap().status, EntityStatus::Failed);
    assert!(coordinator.get_ui_status().error.is_some());

    let outcome = coordinator.refresh_team(100, 5).await;
    assert_eq!(outcome, WorkflowOutcome::Completed);

    let entry = coordinator.matches().get(1).unwrap();
    assert_eq!(entry.status, EntityStatus::Ready);
    assert!(entry.error.is_none());
    assert!(entry.data.is_some());
    assert_eq!(coordinator.players().ids(), vec![11]);
    assert_eq!(transport.forced_calls_to("matches/1"), 1);
    assert_eq!(transport.forced_calls_to(TEAM), 1);
}

#[tokio::test]
async fn refresh_unknown_team_fails() {
    let transport = FakeTransport::new();
    let coordinator = in_memory(&transport);

    assert_eq!(coordinator.refresh_team(100, 5).await, WorkflowOutcome::Failed);
    assert_eq!(
        coordinator.get_ui_status().error.as_deref(),
        Some("team 100:5 not found")
    );
    assert_eq!(transport.calls_to(TEAM), 0);
}

#[tokio::test]
async fn manual_refresh_is_skipped_by_idle_refresh() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    let coordinator = in_memory(&transport);
    coordinator.add_team(100, 5).await;
    let key = TeamKey::new(100, 5);

    let gate = transport.gate(TEAM);
    let manual = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.refresh_team(100, 5).await }
    });
    wait_for_call(&transport, TEAM, 2).await;
    assert!(coordinator.is_refreshing(key));
    assert!(coordinator.get_ui_status().is_loading);

    assert_eq!(coordinator.refresh_idle_teams().await, 0);

    gate.notify_one();
    assert_eq!(manual.await.unwrap(), WorkflowOutcome::Completed);
    assert!(!coordinator.is_refreshing(key));
    assert_eq!(coordinator.refresh_idle_teams().await, 1);
}

#[tokio::test]
async fn remove_team_prunes_orphans_but_keeps_shared() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    transport.ok("teams/300?leagueId=5", team_json(300, "Gaimin Gladiators", &[2]));
    transport.ok("players/31", player_json(31));
    let coordinator = in_memory(&transport);

    coordinator.add_team(100, 5).await;
    coordinator.add_team(300, 5).await;
    assert_eq!(coordinator.players().len(), 6);

    assert!(coordinator.remove_team(100, 5));
    assert_eq!(coordinator.teams().keys(), vec![TeamKey::new(300, 5)]);
    assert_eq!(coordinator.matches().ids(), vec![2]);
    assert_eq!(coordinator.players().ids(), vec![31]);

    assert!(!coordinator.remove_team(100, 5));
}

#[tokio::test]
async fn remove_team_mid_workflow_stops_it() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    let gate = transport.gate("matches/1");
    let coordinator = in_memory(&transport);

    let pending = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.add_team(100, 5).await }
    });
    wait_for_call(&transport, "matches/1", 1).await;

    assert!(coordinator.remove_team(100, 5));
    gate.notify_one();

    assert_eq!(pending.await.unwrap(), WorkflowOutcome::Superseded);
    assert!(coordinator.teams().is_empty());
    assert!(coordinator.matches().is_empty());
    assert!(coordinator.players().is_empty());
    assert_eq!(transport.calls_to("matches/2"), 0);
    assert!(!coordinator.get_ui_status().is_loading);
}

#[tokio::test]
async fn state_round_trips_through_database() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    let db = Database::open_in_memory().unwrap();

    let first = coordinator(&transport, Arc::new(db.clone()));
    first.add_team(100, 5).await;

    let second = coordinator(&FakeTransport::new(), Arc::new(db));
    let summary = second.restore();
    assert_eq!(summary.teams, 1);
    assert_eq!(summary.matches, 2);
    assert_eq!(summary.players, 5);
    assert_eq!(summary.heroes, 0);

    let team = second.teams().get(TeamKey::new(100, 5)).unwrap();
    assert_eq!(team.display_name(), "Team Spirit");
    assert_eq!(team.players, ROSTER.to_vec());
    assert!(!second.get_ui_status().is_loading);
}

#[tokio::test]
async fn persistence_failures_do_not_fail_workflows() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    let coordinator = coordinator(&transport, Arc::new(FailingPersistence));

    assert_eq!(coordinator.add_team(100, 5).await, WorkflowOutcome::Completed);
    assert!(coordinator.get_ui_status().error.is_none());
    assert_eq!(coordinator.restore(), RestoreSummary::default());
}

#[tokio::test]
async fn clear_all_errors_and_contexts() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    transport.network_error("heroes");
    let coordinator = in_memory(&transport);

    coordinator.add_team(100, 5).await;
    coordinator.load_heroes(false).await;
    coordinator.players().refresh(99).await;
    coordinator.teams().select(Some(TeamKey::new(100, 5)));
    coordinator.matches().select(Some(1));

    let status = coordinator.get_ui_status();
    assert!(status.error.is_some());
    assert!(status.can_retry);

    coordinator.clear_all_errors();
    let status = coordinator.get_ui_status();
    assert!(status.error.is_none());
    assert!(!status.can_retry);

    coordinator.clear_all_contexts();
    assert!(coordinator.teams().active_key().is_none());
    assert!(coordinator.matches().selected().is_none());
    assert_eq!(coordinator.teams().len(), 1);
}

#[tokio::test]
async fn heroes_load_through_coordinator() {
    let transport = FakeTransport::new();
    transport.ok("heroes", heroes_json());
    let coordinator = in_memory(&transport);

    let heroes = coordinator.load_heroes(false).await.ready().unwrap();
    assert_eq!(heroes.len(), 2);
    assert_eq!(coordinator.heroes().hero(1).unwrap().localized_name, "Anti-Mage");
}

#[tokio::test]
async fn idle_refresh_leaves_user_workflow_alone() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    let team_300 = "teams/300?leagueId=5";
    transport.ok(team_300, team_json(300, "Gaimin Gladiators", &[2]));
    transport.ok("players/31", player_json(31));
    let coordinator = in_memory(&transport);
    coordinator.add_team(100, 5).await;

    let gate = transport.gate(team_300);
    let user = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.add_team(300, 5).await }
    });
    wait_for_call(&transport, team_300, 1).await;

    assert_eq!(coordinator.refresh_idle_teams().await, 1);
    assert_eq!(transport.forced_calls_to(TEAM), 1);
    assert_eq!(transport.forced_calls_to(team_300), 0);

    let status = coordinator.workflow_status();
    assert!(status.running);
    assert_eq!(status.label.as_deref(), Some("Adding team 300:5"));

    gate.notify_one();
    assert_eq!(user.await.unwrap(), WorkflowOutcome::Completed);
    assert_eq!(
        coordinator.workflow_status().label.as_deref(),
        Some("Adding team 300:5")
    );
    assert_eq!(coordinator.teams().get(TeamKey::new(300, 5)).unwrap().players, vec![31]);
}

#[tokio::test]
async fn idle_refresh_does_not_replace_retry_command() {
    let transport = FakeTransport::new();
    serve_team_100(&transport);
    transport.status("teams/300?leagueId=5", 503, r#"{"error":"OpenDota unavailable"}"#);
    transport.ok("teams/300?leagueId=5", team_json(300, "Gaimin Gladiators", &[]));
    let coordinator = in_memory(&transport);
    coordinator.add_team(100, 5).await;

    assert_eq!(coordinator.add_team(300, 5).await, WorkflowOutcome::Failed);
    assert_eq!(coordinator.refresh_idle_teams().await, 2);

    let status = coordinator.workflow_status();
    assert_eq!(status.label.as_deref(), Some("Adding team 300:5"));
    assert_eq!(status.error.as_deref(), Some("OpenDota unavailable"));
    assert!(coordinator.get_ui_status().can_retry);

    assert_eq!(coordinator.retry().await, Some(WorkflowOutcome::Completed));
    assert_eq!(
        coordinator.workflow_status().label.as_deref(),
        Some("Adding team 300:5")
    );
}

#[tokio::test]
async fn refresh_that_delists_a_match_drops_its_players() {
    let transport = FakeTransport::new();
    transport.ok(TEAM, team_json(100, "Team Spirit", &[1]));
    transport.ok(TEAM, team_json(100, "Team Spirit", &[2]));
    transport.ok("leagues/5", league_json(5, "The International"));
    transport.ok("matches/1", match_json(1, 100, 200, &[11], &[21]));
    transport.ok("matches/2", match_json(2, 100, 200, &[12], &[22]));
    transport.ok("players/11", player_json(11));
    transport.ok("players/12", player_json(12));
    let coordinator = in_memory(&transport);

    coordinator.add_team(100, 5).await;
    assert_eq!(coordinator.players().ids(), vec![11]);

    assert_eq!(coordinator.refresh_team(100, 5).await, WorkflowOutcome::Completed);

    let team = coordinator.teams().get(TeamKey::new(100, 5)).unwrap();
    assert_eq!(team.match_ids, vec![2]);
    assert_eq!(team.matches.keys().copied().collect::<Vec<_>>(), vec![2]);
    assert_eq!(team.players, vec![12]);
    assert_eq!(coordinator.matches().ids(), vec![2]);
    assert_eq!(coordinator.players().ids(), vec![12]);
}
