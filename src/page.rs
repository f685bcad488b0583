use crate::board;
use crate::services;

const STYLE: &str = "
body { margin: 0; width: 800px; height: 480px; overflow: hidden; background: #000; color: #fff;
       font-family: 'Roboto Condensed', Arial, sans-serif; }
.departure-board { padding: 12px 16px; }
.header { display: flex; justify-content: space-between; align-items: baseline;
          border-bottom: 2px solid #fff; padding-bottom: 6px; }
.station-name { font-size: 30px; font-weight: bold; }
.last-updated { font-size: 16px; }
.platforms { display: flex; gap: 16px; margin-top: 8px; }
.platform { flex: 1; }
.platform h2 { font-size: 20px; margin: 4px 0; }
.service-item { display: flex; align-items: center; border-bottom: 1px solid #444; padding: 5px 0; }
.service-time { width: 62px; }
.scheduled-time { font-size: 20px; font-weight: bold; }
.estimated-time { font-size: 14px; color: #ffd24d; }
.service-details { flex: 1; }
.destination { font-size: 18px; }
.operator { font-size: 12px; color: #bbb; }
.service-status { font-size: 15px; font-weight: bold; text-align: right; width: 80px; }
.status-on-time { color: #6fdc6f; }
.status-delayed { color: #ffd24d; }
.status-cancelled { color: #ff6b6b; }
.loading { padding: 10px 0; color: #bbb; }
.unassigned { margin-top: 6px; font-size: 13px; color: #bbb; }
";

pub fn render_board(data: &board::BoardData) -> String {
    let mut body = String::new();
    body.push_str("<div class='departure-board'>");
    body.push_str(&format!(
        "<div class='header'><div class='station-name'>{}</div><div class='last-updated'>Updated <span id='update-time'>{}</span></div></div>",
        escape(&data.station_name), escape(&data.last_updated)));

    body.push_str("<div class='platforms'>");
    render_platform(&mut body, "platform-1", "Platform 1", &data.groups.platform_1);
    render_platform(&mut body, "platform-2", "Platform 2", &data.groups.platform_2);
    body.push_str("</div>");

    if !data.groups.no_platform.is_empty() {
        let listed: Vec<String> = data.groups.no_platform.iter()
            .map(|s| format!("{} {} ({})", escape(&s.scheduled_time), escape(&s.destination), escape(&s.status)))
            .collect();
        body.push_str(&format!("<div class='unassigned'>Platform TBC: {}</div>", listed.join(", ")));
    }

    body.push_str("</div>");
    return wrap_page(&data.station_name, &body);
}

pub fn render_error(message: &str) -> String {
    return wrap_page(
        "Departures",
        &format!("<div class='departure-board'><div class='loading' style='color: #ff6b6b;'>{}</div></div>",
                 escape(message)));
}

fn render_platform(body: &mut String, id: &str, title: &str, services: &[services::CanonicalService]) {
    body.push_str(&format!("<div class='platform'><h2>{}</h2><div id='{}'>", title, id));
    if services.is_empty() {
        body.push_str("<div class='loading'>No services</div>");
    }
    for service in services {
        render_service(body, service);
    }
    body.push_str("</div></div>");
}

fn render_service(body: &mut String, service: &services::CanonicalService) {
    let estimated = if !service.estimated_time.is_empty()
        && service.estimated_time != service.scheduled_time
        && service.estimated_time != "On time" {
        format!("<div class='estimated-time'>{}</div>", escape(&service.estimated_time))
    } else {
        "".to_string()
    };

    body.push_str(&format!(
        "<div class='service-item'>\
           <div class='service-time'><div class='scheduled-time'>{}</div>{}</div>\
           <div class='service-details'><div class='destination'>{}</div><div class='operator'>{}</div></div>\
           <div class='service-status status-{}'>{}</div>\
         </div>",
        escape(&service.scheduled_time),
        estimated,
        escape(&service.destination),
        escape(&service.operator),
        service.status_class.css_name(),
        escape(&service.status)));
}

fn wrap_page(title: &str, body: &str) -> String {
    return format!(
        "<!DOCTYPE html><html><head><meta charset='utf-8'>\
         <meta http-equiv='refresh' content='30'>\
         <title>{}</title><style>{}</style></head><body>{}</body></html>",
        escape(title), STYLE, body);
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    return out;
}
