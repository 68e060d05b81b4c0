diesel::table! {
    player (id) {
        id -> Integer,
        mark -> Text,
    }
}

diesel::table! {
    game_board (id) {
        id -> Integer,
        p1 -> Nullable<Integer>,
        p2 -> Nullable<Integer>,
        game_started -> Bool,
        turn -> Integer,
        board_state -> Text,
        winner -> Nullable<Integer>,
        is_draw -> Bool,
    }
}

diesel::allow_tables_to_appear_in_same_query!(game_board, player);
