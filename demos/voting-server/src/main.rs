use tourney::prelude::*;

#[tokio::main]
async fn main() -> Result<(), TourneyError> {
    tourney::init_tracing();

    let config = ServerConfig::from_env()?;
    let server = TourneyServer::builder().config(&config).build().await?;

    if config.demo_room {
        let room_id = RoomId::generate();
        server.store().try_dispatch(Action::CreateRoom {
            room_id: room_id.clone(),
            name: "Demo Room".into(),
            theme: "Movies".into(),
            creator: ParticipantId::new("System"),
        })?;
        tracing::info!(%room_id, "demo room created");
    }

    tracing::info!(
        addr = %server.local_addr()?,
        vote_policy = ?config.rules.vote_policy,
        "voting server started"
    );
    server.run().await
}
