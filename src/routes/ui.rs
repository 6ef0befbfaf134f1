use axum::{response::Html, routing::get, Router};

use crate::models::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>CSV Upload</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
    h1 { margin-bottom: 0.5rem; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    button { margin-top: 1rem; padding: 0.6rem 1rem; }
    pre { background: #f6f8fa; padding: 1rem; overflow: auto; }
  </style>
</head>
<body>
  <h1>CSV Upload</h1>
  <p>Upload a users CSV. It goes straight to storage and is ingested automatically.</p>

  <div class="card">
    <input id="file" type="file" accept=".csv,text/csv" />
    <button id="uploadBtn">Upload</button>
  </div>

  <div class="card">
    <h2>Log</h2>
    <pre id="log"></pre>
  </div>

  <script>
    const uploadBtn = document.getElementById('uploadBtn');
    const fileInput = document.getElementById('file');
    const log = document.getElementById('log');

    function append(msg) {
      log.textContent += msg + "\n";
    }

    uploadBtn.addEventListener('click', async () => {
      const file = fileInput.files[0];
      if (!file) {
        append('Choose a CSV file first.');
        return;
      }
      append('Requesting presigned URL...');
      try {
        const qs = new URLSearchParams({ filename: file.name });
        const presign = await fetch('/api/presign?' + qs.toString());
        const body = await presign.json();
        if (!presign.ok) throw new Error(body.error || 'Presign failed');

        append('Uploading to ' + body.s3_key + '...');
        const upload = await fetch(body.upload_url, {
          method: 'PUT',
          headers: { 'Content-Type': 'text/csv' },
          body: file
        });
        if (!upload.ok) throw new Error('Upload failed: ' + upload.status);
        append('Upload complete. Waiting for pipeline...');
      } catch (e) {
        append('Error: ' + e.message);
      }
    });
  </script>
</body>
</html>"#)
}
