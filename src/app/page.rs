use crate::domain::model::SpeechRate;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AI Toolbox Hub</title>
    <style>
        body { font-family: system-ui, sans-serif; max-width: 900px; margin: 0 auto; padding: 20px;
               background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; }
        .container { background: #fff; padding: 30px; border-radius: 15px; box-shadow: 0 10px 30px rgba(0,0,0,.2); }
        h1 { text-align: center; color: #333; }
        label { display: block; margin-bottom: 8px; font-weight: 600; color: #555; }
        textarea { width: 100%; padding: 12px; border: 2px solid #e1e5e9; border-radius: 8px; font-size: 16px; }
        button { background: #667eea; color: #fff; padding: 12px 24px; border: none; border-radius: 8px;
                 cursor: pointer; font-size: 16px; font-weight: 600; }
        button:disabled { background: #ccc; cursor: not-allowed; }
        .info { background: #f8f9fa; padding: 20px; border-radius: 10px; border-left: 4px solid #667eea; margin-bottom: 25px; }
        .status { margin-top: 15px; padding: 12px; border-radius: 8px; }
        .success { background: #d4edda; color: #155724; }
        .error { background: #f8d7da; color: #721c24; }
        .pending { background: #cce7ff; color: #004085; }
        audio { width: 100%; margin-top: 15px; }
        pre { background: #f4f4f4; padding: 15px; border-radius: 8px; overflow-x: auto; font-size: 14px; }
    </style>
</head>
<body>
<div class="container">
    <h1>Text-to-Speech API</h1>

    <div class="info">
        <p><strong>Status:</strong> Online and Ready</p>
        <p><strong>API Key:</strong> <code>{{API_KEY}}</code></p>
        <p><strong>Base URL:</strong> <code>{{BASE_URL}}</code></p>
    </div>

    <form id="ttsForm">
        <label for="textInput">Enter text to convert to speech:</label>
        <textarea id="textInput" rows="4" placeholder="Type or paste your text here..." required></textarea>

        <label for="rateInput">Speech Rate ({{MIN_RATE}}-{{MAX_RATE}} WPM):</label>
        <input type="range" id="rateInput" min="{{MIN_RATE}}" max="{{MAX_RATE}}" value="{{DEFAULT_RATE}}" style="width: 100%;">
        <span id="rateValue">{{DEFAULT_RATE}} WPM</span>
        <p><button type="submit" id="convertBtn">Convert to Speech</button></p>
    </form>

    <div id="status"></div>
    <div id="audioResult"></div>

    <h3>Available Endpoints</h3>
    <ul>
        <li><strong>Text-to-Speech:</strong> POST /tts</li>
        <li><strong>Speech-to-Text:</strong> POST /transcribe</li>
        <li><strong>Health Check:</strong> <a href="/health" target="_blank">GET /health</a></li>
        <li><strong>API Key:</strong> <a href="/key" target="_blank">GET /key</a></li>
    </ul>

    <h3>cURL Examples</h3>
    <pre>curl -X POST "{{BASE_URL}}/tts?text=Hello%20world!&amp;rate={{DEFAULT_RATE}}" \
  -H "X-API-Key: {{API_KEY}}" \
  --output speech.wav

curl -X POST "{{BASE_URL}}/transcribe?device=cpu" \
  -H "X-API-Key: {{API_KEY}}" \
  -F "file=@video.mp4"</pre>
</div>

<script>
    const API_KEY = '{{API_KEY}}';
    const rateInput = document.getElementById('rateInput');
    const rateValue = document.getElementById('rateValue');
    const statusBox = document.getElementById('status');

    function showStatus(message, type) {
        statusBox.innerHTML = '';
        const div = document.createElement('div');
        div.className = 'status ' + type;
        div.textContent = message;
        statusBox.appendChild(div);
    }

    rateInput.addEventListener('input', function () {
        rateValue.textContent = this.value + ' WPM';
    });

    document.getElementById('ttsForm').addEventListener('submit', async function (e) {
        e.preventDefault();
        const text = document.getElementById('textInput').value.trim();
        const button = document.getElementById('convertBtn');
        const result = document.getElementById('audioResult');
        if (!text) {
            showStatus('Please enter some text to convert.', 'error');
            return;
        }

        button.disabled = true;
        showStatus('Converting text to speech...', 'pending');
        try {
            const params = new URLSearchParams({ text: text, rate: rateInput.value });
            const response = await fetch('/tts?' + params.toString(), {
                method: 'POST',
                headers: { 'X-API-Key': API_KEY }
            });
            if (response.ok) {
                const url = URL.createObjectURL(await response.blob());
                result.innerHTML = '<audio controls autoplay><source src="' + url + '" type="audio/wav"></audio>'
                    + '<p><a href="' + url + '" download="speech.wav">Download Audio</a></p>';
                showStatus('Text converted to speech successfully!', 'success');
            } else {
                showStatus('Error: ' + response.status + ' - ' + await response.text(), 'error');
            }
        } catch (error) {
            showStatus('Network error: ' + error.message, 'error');
        } finally {
            button.disabled = false;
        }
    });

    window.addEventListener('load', async function () {
        try {
            const response = await fetch('/health');
            showStatus(response.ok ? 'API is online and ready to use!' : 'API is not responding properly.',
                       response.ok ? 'success' : 'error');
        } catch (error) {
            showStatus('Cannot connect to API. Service may be down.', 'error');
        }
    });
</script>
</body>
</html>
"#;

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\\' => out.push_str("&#92;"),
            _ => out.push(c),
        }
    }
    out
}

/// Test page with the key, base URL and default rate filled in.
pub fn render(api_key: &str, base_url: &str, default_rate: SpeechRate) -> String {
    TEMPLATE
        .replace("{{API_KEY}}", &escape(api_key))
        .replace("{{BASE_URL}}", &escape(base_url))
        .replace("{{DEFAULT_RATE}}", &default_rate.wpm().to_string())
        .replace("{{MIN_RATE}}", &SpeechRate::MIN.to_string())
        .replace("{{MAX_RATE}}", &SpeechRate::MAX.to_string())
}
