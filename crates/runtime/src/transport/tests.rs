use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) {
	let json_bytes = serde_json::to_vec(message).unwrap();
	let length = json_bytes.len() as u32;
	writer.write_all(&length.to_le_bytes()).await.unwrap();
	writer.write_all(&json_bytes).await.unwrap();
	writer.flush().await.unwrap();
}

#[tokio::test]
async fn test_send_message() {
	// transport writes into `to_remote`, the test reads from `remote_in`
	let (mut remote_in, to_remote) = tokio::io::duplex(1024);
	let (from_remote, _remote_out) = tokio::io::duplex(1024);

	let (transport, _rx) = PipeTransport::new(to_remote, from_remote);
	let (mut sender, _receiver) = transport.into_parts();

	let test_message = serde_json::json!({
		"id": 1,
		"channel": "shared",
		"method": "open",
		"params": {"uuid": "u", "url": "https://example.com"}
	});

	sender.send(test_message.clone()).await.unwrap();

	let mut len_buf = [0u8; 4];
	remote_in.read_exact(&mut len_buf).await.unwrap();
	let length = u32::from_le_bytes(len_buf) as usize;

	let mut msg_buf = vec![0u8; length];
	remote_in.read_exact(&mut msg_buf).await.unwrap();

	let received: Value = serde_json::from_slice(&msg_buf).unwrap();
	assert_eq!(received, test_message);
}

#[tokio::test]
async fn test_multiple_messages_in_sequence() {
	let (_remote_in, to_remote) = tokio::io::duplex(4096);
	let (from_remote, mut remote_out) = tokio::io::duplex(4096);

	let (mut transport, mut rx) = PipeTransport::new(to_remote, from_remote);
	let read_task = tokio::spawn(async move { transport.run().await });

	let messages = vec![
		serde_json::json!({"channel": "shared", "method": "onLoadStart", "params": {"uuid": "a"}}),
		serde_json::json!({"channel": {"instance": 3}, "method": "onLoadStop", "params": {}}),
		serde_json::json!({"id": 7, "result": true}),
	];

	for msg in &messages {
		write_frame(&mut remote_out, msg).await;
	}

	for expected in &messages {
		let received = rx.recv().await.unwrap();
		assert_eq!(&received, expected);
	}

	drop(remote_out);
	drop(rx);
	let _ = read_task.await;
}

#[tokio::test]
async fn test_large_message() {
	let (_remote_in, to_remote) = tokio::io::duplex(1024 * 1024);
	let (from_remote, mut remote_out) = tokio::io::duplex(1024 * 1024);

	let (mut transport, mut rx) = PipeTransport::new(to_remote, from_remote);
	let read_task = tokio::spawn(async move { transport.run().await });

	// screenshot-sized payload, larger than the duplex buffer's chunking
	let large_message = serde_json::json!({
		"id": 1,
		"result": "x".repeat(100_000)
	});
	write_frame(&mut remote_out, &large_message).await;

	let received = rx.recv().await.unwrap();
	assert_eq!(received, large_message);

	drop(remote_out);
	drop(rx);
	let _ = read_task.await;
}

#[tokio::test]
async fn test_malformed_length_prefix() {
	let (_remote_in, to_remote) = tokio::io::duplex(1024);
	let (from_remote, mut remote_out) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(to_remote, from_remote);

	// only half a length prefix before EOF
	remote_out.write_all(&[0x01, 0x02]).await.unwrap();
	remote_out.flush().await.unwrap();
	drop(remote_out);

	let result = transport.run().await;
	assert!(
		result
			.unwrap_err()
			.to_string()
			.contains("Failed to read length prefix")
	);
}

#[tokio::test]
async fn test_invalid_json_frame() {
	let (_remote_in, to_remote) = tokio::io::duplex(1024);
	let (from_remote, mut remote_out) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(to_remote, from_remote);

	let garbage = b"{not json";
	remote_out
		.write_all(&(garbage.len() as u32).to_le_bytes())
		.await
		.unwrap();
	remote_out.write_all(garbage).await.unwrap();
	remote_out.flush().await.unwrap();

	let err = transport.run().await.unwrap_err();
	assert!(err.is_transport());
	assert!(err.to_string().contains("not valid JSON"));
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
	let (_remote_in, to_remote) = tokio::io::duplex(1024);
	let (from_remote, mut remote_out) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(to_remote, from_remote);

	remote_out.write_all(&u32::MAX.to_le_bytes()).await.unwrap();
	remote_out.flush().await.unwrap();

	let err = transport.run().await.unwrap_err();
	assert!(err.to_string().contains("exceeds limit"));
}

#[tokio::test]
async fn test_broken_pipe() {
	let (_remote_in, to_remote) = tokio::io::duplex(1024);
	let (from_remote, remote_out) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(to_remote, from_remote);
	drop(remote_out);

	let read_task = tokio::spawn(async move { transport.run().await });
	let result = read_task.await.unwrap();
	assert!(result.is_err());
}

#[tokio::test]
async fn test_receiver_dropped_stops_reader() {
	let (_remote_in, to_remote) = tokio::io::duplex(1024);
	let (from_remote, mut remote_out) = tokio::io::duplex(1024);

	let (mut transport, rx) = PipeTransport::new(to_remote, from_remote);
	drop(rx);

	write_frame(&mut remote_out, &serde_json::json!({"id": 1, "result": null})).await;

	// forwarding fails, so the reader returns cleanly without waiting for EOF
	let result = transport.run().await;
	assert!(result.is_ok());
}
