mod events_and_console;
mod html_parsing;
